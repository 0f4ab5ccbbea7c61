//! MCP tools exposed by the engine.

mod format;
mod mantle;
mod recoup;

use std::sync::Arc;

use async_trait::async_trait;
use mantle_mcp_data::{DataError, DefiLlamaClient, RecoupClient};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub use format::format_number;
pub use mantle::{
    LtvTool, ProtocolSummaryTool, StablecoinTvlTool, TokenPriceTool, USDC_STABLECOIN_ID,
    USDT_STABLECOIN_ID,
};
pub use recoup::{ArtistFansTool, ArtistPostsTool, ArtistProfileTool};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// One callable tool. `call` returns the text content of the result.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError>;
}

/// Decode a tool's arguments; a missing object counts as `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Tools in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any earlier tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `tools/list` descriptors.
    pub fn descriptors(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.input_schema(),
                })
            })
            .collect()
    }
}

/// Registry with every Mantle and Recoup tool.
pub fn default_registry(llama: &DefiLlamaClient, recoup: &RecoupClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(TokenPriceTool::new(llama.clone())));
    registry.register(Arc::new(LtvTool::new(llama.clone())));
    registry.register(Arc::new(ProtocolSummaryTool::merchant_moe(llama.clone())));
    registry.register(Arc::new(ProtocolSummaryTool::treehouse(llama.clone())));
    registry.register(Arc::new(StablecoinTvlTool::usdt(llama.clone())));
    registry.register(Arc::new(StablecoinTvlTool::usdc(llama.clone())));
    registry.register(Arc::new(ArtistFansTool::new(recoup.clone())));
    registry.register(Arc::new(ArtistPostsTool::new(recoup.clone())));
    registry.register(Arc::new(ArtistProfileTool::new(recoup.clone())));
    registry
}
