//! Shared reqwest plumbing for the upstream clients.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::DataError;

/// Build a JSON-speaking HTTP client with the given request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, DataError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    // reqwest is built with `rustls-no-provider`; `Err` only means a provider
    // was already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

/// Validate and normalise a base URL (no trailing slash).
pub(crate) fn normalise_base_url(name: &str, base_url: &str) -> Result<String, DataError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(DataError::Config(format!("{name} is empty")));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(DataError::Config(format!(
            "{name} must be an http(s) URL, got {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Check HTTP response status, returning error for non-success codes.
fn check_status(resp: &reqwest::Response) -> Result<(), DataError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(DataError::Api {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").into(),
        });
    }
    Ok(())
}

/// GET `url` and decode the JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: reqwest::Url,
) -> Result<T, DataError> {
    debug!(url = %url, "Upstream request");
    let resp = http.get(url).send().await?;
    check_status(&resp)?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
