//! Recoup REST client.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::types::{ArtistProfile, Envelope, FanPage, PostPage, ProfileResponse};
use crate::error::DataError;
use crate::http::{build_client, get_json, normalise_base_url};
use crate::pagination::PageQuery;

#[derive(Debug, Clone)]
pub struct RecoupConfig {
    /// API root, e.g. `https://api.recoupable.com/api`.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RecoupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.recoupable.com/api".into(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoupClient {
    http: reqwest::Client,
    base_url: String,
}

impl RecoupClient {
    pub fn new(config: &RecoupConfig) -> Result<Self, DataError> {
        Ok(Self {
            http: build_client(config.timeout)?,
            base_url: normalise_base_url("recoup_base_url", &config.base_url)?,
        })
    }

    /// Build an endpoint URL with encoded query parameters.
    pub(crate) fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, DataError> {
        let base = format!("{}{path}", self.base_url);
        Url::parse_with_params(&base, params)
            .map_err(|e| DataError::Config(format!("Invalid URL {base}: {e}")))
    }

    fn require_artist(artist_account_id: &str) -> Result<(), DataError> {
        if artist_account_id.trim().is_empty() {
            return Err(DataError::Validation("artist_account_id is required".into()));
        }
        Ok(())
    }

    /// GET an endpoint and unwrap the `status` envelope.
    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, DataError> {
        let value: Value = get_json(&self.http, url).await?;
        let envelope = Envelope::deserialize(&value)?;
        if envelope.status == "error" {
            let message = envelope
                .message
                .unwrap_or_else(|| "request failed".to_string());
            warn!(message = %message, "Recoup API reported an error");
            return Err(DataError::Upstream(message));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// One page of an artist's fans across all social profiles.
    pub async fn fans(
        &self,
        artist_account_id: &str,
        query: PageQuery,
    ) -> Result<FanPage, DataError> {
        Self::require_artist(artist_account_id)?;
        let (page, limit) = query.resolve()?;
        let url = self.endpoint(
            "/fans",
            &[
                ("artist_account_id", artist_account_id.to_string()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        self.fetch(url).await
    }

    /// One page of an artist's posts across all social profiles.
    pub async fn posts(
        &self,
        artist_account_id: &str,
        query: PageQuery,
    ) -> Result<PostPage, DataError> {
        Self::require_artist(artist_account_id)?;
        let (page, limit) = query.resolve()?;
        let url = self.endpoint(
            "/posts",
            &[
                ("artist_account_id", artist_account_id.to_string()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        self.fetch(url).await
    }

    /// Aggregated profile of an artist.
    pub async fn artist_profile(&self, artist_account_id: &str) -> Result<ArtistProfile, DataError> {
        Self::require_artist(artist_account_id)?;
        let url = self.endpoint(
            "/artist-profile",
            &[("artist_account_id", artist_account_id.to_string())],
        )?;
        let resp: ProfileResponse = self.fetch(url).await?;
        Ok(resp.profile)
    }
}
