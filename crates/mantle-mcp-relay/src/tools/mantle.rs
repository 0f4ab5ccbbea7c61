//! Mantle network tools backed by DefiLlama.

use async_trait::async_trait;
use mantle_mcp_data::DefiLlamaClient;
use mantle_mcp_data::defillama::{ProtocolSummary, TvlSummary};
use serde::Deserialize;
use serde_json::{Value, json};

use super::format::format_number;
use super::{Tool, ToolError, parse_args};

/// DefiLlama stablecoin id of USDT.
pub const USDT_STABLECOIN_ID: u32 = 1;
/// DefiLlama stablecoin id of USDC.
pub const USDC_STABLECOIN_ID: u32 = 2;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

pub struct TokenPriceTool {
    client: DefiLlamaClient,
}

impl TokenPriceTool {
    pub const fn new(client: DefiLlamaClient) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct TokenPriceArgs {
    contract_address: String,
}

#[async_trait]
impl Tool for TokenPriceTool {
    fn name(&self) -> &str {
        "get-token-price"
    }

    fn description(&self) -> &str {
        "Get the price of a token in mantle network"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "contract_address": {
                    "type": "string",
                    "description": "Token contract address on Mantle"
                }
            },
            "required": ["contract_address"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let args: TokenPriceArgs = parse_args(arguments)?;
        let price = self.client.token_price(&args.contract_address).await?;
        Ok(format!("Price of {}: {}", price.symbol, price.price))
    }
}

pub struct LtvTool {
    client: DefiLlamaClient,
}

impl LtvTool {
    pub const fn new(client: DefiLlamaClient) -> Self {
        Self { client }
    }
}

pub(crate) fn render_tvl(summary: &TvlSummary) -> String {
    format!(
        "Current Mantle TVL: ${}\n24h Change: {:.2}%\n7d Change: {:.2}%",
        format_number(summary.latest),
        summary.daily_change_pct,
        summary.weekly_change_pct
    )
}

#[async_trait]
impl Tool for LtvTool {
    fn name(&self) -> &str {
        "get-ltv"
    }

    fn description(&self) -> &str {
        "Get the total value locked of mantle network"
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let _: NoArgs = parse_args(arguments)?;
        let summary = self.client.chain_tvl_summary().await?;
        Ok(render_tvl(&summary))
    }
}

/// Summary of one fixed protocol.
pub struct ProtocolSummaryTool {
    client: DefiLlamaClient,
    name: &'static str,
    description: &'static str,
    slug: &'static str,
}

impl ProtocolSummaryTool {
    pub const fn merchant_moe(client: DefiLlamaClient) -> Self {
        Self {
            client,
            name: "get-protocol-merchant-moe-summary",
            description: "Get key metrics for the Merchant Moe protocol on Mantle",
            slug: "merchant-moe",
        }
    }

    pub const fn treehouse(client: DefiLlamaClient) -> Self {
        Self {
            client,
            name: "get-protocol-treehouse-protocol-summary",
            description: "Get key metrics for a Tree House on Mantle",
            slug: "treehouse-protocol",
        }
    }
}

pub(crate) fn render_protocol(summary: &ProtocolSummary) -> String {
    let mut presence = Vec::new();
    if summary.social_presence.has_twitter {
        presence.push("Twitter");
    }
    if summary.social_presence.has_github {
        presence.push("Github");
    }
    presence.push(if summary.is_multi_chain {
        "Multi-Chain"
    } else {
        "Single-Chain"
    });

    [
        format!("{} {}", summary.health.category, summary.name),
        format!("TVL: ${}", format_number(summary.tvl)),
        format!("Health Score: {}/100", summary.health.score),
        format!(
            "Social Presence: {} platforms",
            summary.social_presence.platform_count
        ),
        format!("Market Presence: {}", presence.join(" ")),
    ]
    .join("\n")
}

#[async_trait]
impl Tool for ProtocolSummaryTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let _: NoArgs = parse_args(arguments)?;
        let summary = self.client.protocol_summary(self.slug).await?;
        Ok(render_protocol(&summary))
    }
}

/// Bridged TVL of one stablecoin.
pub struct StablecoinTvlTool {
    client: DefiLlamaClient,
    name: &'static str,
    description: &'static str,
    symbol: &'static str,
    stablecoin_id: u32,
}

impl StablecoinTvlTool {
    pub const fn usdt(client: DefiLlamaClient) -> Self {
        Self {
            client,
            name: "get-USDT-tvl",
            description: "Get the total value locked of USDT on Mantle",
            symbol: "USDT",
            stablecoin_id: USDT_STABLECOIN_ID,
        }
    }

    pub const fn usdc(client: DefiLlamaClient) -> Self {
        Self {
            client,
            name: "get-USDC-tvl",
            description: "Get the total value locked of USDC on Mantle",
            symbol: "USDC",
            stablecoin_id: USDC_STABLECOIN_ID,
        }
    }
}

#[async_trait]
impl Tool for StablecoinTvlTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let _: NoArgs = parse_args(arguments)?;
        let tvl = self.client.stablecoin_tvl(self.stablecoin_id).await?;
        Ok(format!("{} TVL: ${}", self.symbol, format_number(tvl)))
    }
}
