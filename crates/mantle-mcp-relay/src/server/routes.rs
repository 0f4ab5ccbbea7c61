//! Axum routes of the bridge.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use mantle_mcp_core::config::ServerConfig;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use super::health::health;
use crate::bridge::{Correlator, CorrelatorError, InboundCall};
use crate::engine::SseFrame;
use crate::session::SessionTransport;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub transport: SessionTransport,
    pub correlator: Correlator,
    /// Interval of SSE keep-alive comments; `None` disables them.
    pub keepalive: Option<Duration>,
}

impl AppState {
    pub const fn new(transport: SessionTransport, correlator: Correlator) -> Self {
        Self {
            transport,
            correlator,
            keepalive: Some(Duration::from_secs(15)),
        }
    }

    #[must_use]
    pub const fn with_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.keepalive = keepalive;
        self
    }
}

/// Where the two bridge endpoints are mounted.
#[derive(Debug, Clone)]
pub struct RouteSettings {
    pub sse_path: String,
    pub message_path: String,
    pub max_body_bytes: usize,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl RouteSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            sse_path: config.sse_path.clone(),
            message_path: config.message_path.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState, settings: &RouteSettings) -> Router {
    Router::new()
        .route(&settings.sse_path, get(open_stream))
        .route(&settings.message_path, post(post_message))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET on the stream path: open a session and stream its events until
/// either side ends it.
async fn open_stream(State(state): State<AppState>) -> Response {
    let session = match state.transport.open().await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to open session");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };
    info!(session_id = %session.session_id, "Event stream opened");

    let events = session
        .events
        .map(|frame| Ok::<_, Infallible>(to_event(frame)));
    let sse = Sse::new(events);
    match state.keepalive {
        Some(interval) => sse
            .keep_alive(KeepAlive::new().interval(interval))
            .into_response(),
        None => sse.into_response(),
    }
}

fn to_event(frame: SseFrame) -> Event {
    let event = Event::default().data(frame.data);
    match frame.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// POST on the message path: relay the call to the session named by the
/// `sessionId` query parameter and answer with its reply.
async fn post_message(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(session_id) = params.get("sessionId").filter(|id| !id.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "No sessionId provided").into_response();
    };
    let Ok(body) = String::from_utf8(body.to_vec()) else {
        return (StatusCode::BAD_REQUEST, "Invalid message: body is not UTF-8").into_response();
    };

    let call = InboundCall {
        method: method.to_string(),
        url: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string()),
        headers: flatten_headers(&headers),
        body,
    };

    match state.correlator.call(session_id, call).await {
        Ok(reply) => {
            let status =
                StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, reply.body).into_response()
        }
        Err(CorrelatorError::Timeout(after)) => {
            debug!(session_id, ?after, "Call timed out");
            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
        }
        Err(CorrelatorError::Publish(e)) => {
            warn!(session_id, error = %e, "Call could not be relayed");
            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
        }
        Err(e) => {
            error!(session_id, error = %e, "Call failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// Header map as lower-case name to value. Repeated headers are joined with
/// `", "`; values that are not visible ASCII are skipped.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    flat
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/plain"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-raw", HeaderValue::from_bytes(b"\xff").unwrap());

        let flat = flatten_headers(&headers);
        assert_eq!(flat["accept"], "text/plain, application/json");
        assert_eq!(flat["content-type"], "application/json");
        assert!(!flat.contains_key("x-raw"));
    }
}
