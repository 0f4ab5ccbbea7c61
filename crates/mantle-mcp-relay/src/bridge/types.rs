//! Messages exchanged over the relay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An inbound call as captured by the HTTP handler, before correlation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundCall {
    pub method: String,
    /// Path and query, e.g. `/message?sessionId=…`.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// A call addressed to one session, as published on `requests:{sessionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedCall {
    pub request_id: String,
    pub session_id: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl CorrelatedCall {
    pub fn new(request_id: String, session_id: String, call: InboundCall) -> Self {
        Self {
            request_id,
            session_id,
            method: call.method,
            url: call.url,
            headers: call.headers,
            body: call.body,
        }
    }
}

/// The reply to one call, as published on `responses:{sessionId}:{requestId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedReply {
    pub status: u16,
    pub body: String,
}

impl CorrelatedReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Reply sent when the engine fails to handle a call.
    pub fn internal_error() -> Self {
        Self::new(500, "Internal server error")
    }
}
