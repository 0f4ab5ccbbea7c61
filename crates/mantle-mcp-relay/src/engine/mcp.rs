//! MCP JSON-RPC engine.
//!
//! Inbound calls are validated and acknowledged with `202 Accepted`; the
//! JSON-RPC responses go out asynchronously as `message` events on the
//! session's stream.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::jsonrpc::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, IncomingMessage, JSONRPC_VERSION,
    METHOD_NOT_FOUND, RpcError, RpcResponse, parse_messages,
};
use super::{EngineError, EngineFactory, OutboundSink, ProtocolEngine, SseFrame};
use crate::bridge::{CorrelatedReply, SyntheticRequest};
use crate::tools::{ToolError, ToolRegistry};

/// MCP revision spoken by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name and version reported in the `initialize` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "mantle-mcp".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

pub struct McpEngineFactory {
    tools: Arc<ToolRegistry>,
    info: ServerInfo,
    message_path: String,
}

impl McpEngineFactory {
    /// `message_path` is advertised to clients in the `endpoint` event.
    pub fn new(tools: ToolRegistry, message_path: impl Into<String>) -> Self {
        Self {
            tools: Arc::new(tools),
            info: ServerInfo::default(),
            message_path: message_path.into(),
        }
    }
}

impl EngineFactory for McpEngineFactory {
    fn create(&self, session_id: &str, sink: OutboundSink) -> Arc<dyn ProtocolEngine> {
        Arc::new(McpEngine {
            endpoint: format!("{}?sessionId={session_id}", self.message_path),
            message_path: self.message_path.clone(),
            dispatcher: Arc::new(Dispatcher {
                session_id: session_id.to_string(),
                tools: Arc::clone(&self.tools),
                info: self.info.clone(),
                sink,
            }),
        })
    }
}

pub struct McpEngine {
    endpoint: String,
    message_path: String,
    dispatcher: Arc<Dispatcher>,
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

#[async_trait]
impl ProtocolEngine for McpEngine {
    async fn connect(&self) -> Result<(), EngineError> {
        self.dispatcher
            .sink
            .send(SseFrame::new("endpoint", self.endpoint.clone()))
            .await
    }

    async fn handle(&self, mut request: SyntheticRequest) -> Result<CorrelatedReply, EngineError> {
        if request.path() != self.message_path {
            return Ok(CorrelatedReply::new(404, "Not found"));
        }
        if request.method() != Method::POST {
            return Ok(CorrelatedReply::new(405, "Method not allowed"));
        }
        let content_type = request.header("content-type").unwrap_or_default();
        if !is_json(content_type) {
            return Ok(CorrelatedReply::new(
                415,
                format!("Unsupported content-type: {content_type}"),
            ));
        }
        if let Some(requested) = request
            .query_param("sessionId")
            .filter(|id| *id != self.dispatcher.session_id)
        {
            debug!(
                session_id = %self.dispatcher.session_id,
                requested = %requested,
                "Call addressed to another session"
            );
            return Ok(CorrelatedReply::new(400, "Invalid sessionId"));
        }

        let body = request.body_mut().take().unwrap_or_default();
        let messages = match parse_messages(&body) {
            Ok(messages) => messages,
            Err(e) => {
                debug!(session_id = %self.dispatcher.session_id, error = %e, "Rejected message");
                return Ok(CorrelatedReply::new(400, format!("Invalid message: {e}")));
            }
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move { dispatcher.dispatch_all(messages).await });
        Ok(CorrelatedReply::new(202, "Accepted"))
    }

    async fn disconnect(&self) {
        debug!(session_id = %self.dispatcher.session_id, "MCP engine disconnected");
    }
}

#[derive(Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Per-session JSON-RPC dispatcher.
struct Dispatcher {
    session_id: String,
    tools: Arc<ToolRegistry>,
    info: ServerInfo,
    sink: OutboundSink,
}

impl Dispatcher {
    async fn dispatch_all(&self, messages: Vec<IncomingMessage>) {
        for message in messages {
            let Some(response) = self.dispatch(message).await else {
                continue;
            };
            let frame = match serde_json::to_string(&response) {
                Ok(json) => SseFrame::message(json),
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Failed to encode response");
                    continue;
                }
            };
            if self.sink.send(frame).await.is_err() {
                debug!(session_id = %self.session_id, "Stream closed, dropping responses");
                return;
            }
        }
    }

    async fn dispatch(&self, message: IncomingMessage) -> Option<RpcResponse> {
        if message.is_response() {
            debug!(session_id = %self.session_id, "Ignoring client response");
            return None;
        }
        let invalid = |id| {
            Some(RpcResponse::failure(
                id,
                RpcError::new(INVALID_REQUEST, "Invalid Request"),
            ))
        };
        if message.jsonrpc != JSONRPC_VERSION {
            return message.id.and_then(invalid);
        }
        let Some(method) = message.method else {
            return message.id.and_then(invalid);
        };
        let Some(id) = message.id else {
            debug!(session_id = %self.session_id, method = %method, "Notification");
            return None;
        };

        let outcome = match method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.descriptors() })),
            "tools/call" => self.call_tool(message.params).await,
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };
        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        })
    }

    fn initialize(&self) -> Value {
        info!(session_id = %self.session_id, "Client initialized session");
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": self.info.name, "version": self.info.version },
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: CallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;
        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", params.name)))?;

        info!(session_id = %self.session_id, tool = %params.name, "Tool call");
        // Run in its own task so a panicking tool becomes an error response.
        let outcome = tokio::spawn(async move { tool.call(params.arguments).await })
            .await
            .map_err(|e| RpcError::new(INTERNAL_ERROR, format!("Tool failed: {e}")))?;

        match outcome {
            Ok(text) => Ok(json!({ "content": [{ "type": "text", "text": text }] })),
            Err(ToolError::InvalidArguments(msg)) => Err(RpcError::new(
                INVALID_PARAMS,
                format!("Invalid arguments: {msg}"),
            )),
            Err(ToolError::Data(e)) => {
                warn!(session_id = %self.session_id, error = %e, "Tool data fetch failed");
                Ok(json!({
                    "content": [{ "type": "text", "text": format!("Error: {e}") }],
                    "isError": true,
                }))
            }
        }
    }
}
