//! DefiLlama response types.
//!
//! Deserialization structs matching the subset of fields the tools read.

use std::collections::HashMap;

use serde::Deserialize;

/// `GET /prices/current/{coins}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PricesResponse {
    #[serde(default)]
    pub coins: HashMap<String, TokenPrice>,
}

/// Current price of one token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPrice {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// One point of `GET /v2/historicalChainTvl/{chain}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChainTvlPoint {
    pub date: i64,
    pub tvl: f64,
}

/// One point of a protocol's aggregated TVL series.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProtocolTvlPoint {
    pub date: i64,
    #[serde(rename = "totalLiquidityUSD")]
    pub total_liquidity_usd: f64,
}

/// `GET /protocol/{slug}` response (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolInfo {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub github: Option<Vec<String>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub audits: Option<String>,
    #[serde(default)]
    pub tvl: Vec<ProtocolTvlPoint>,
    #[serde(default, rename = "currentChainTvls")]
    pub current_chain_tvls: HashMap<String, f64>,
}

/// Dollar-pegged amount as reported by the stablecoins API.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PeggedAmount {
    #[serde(default, rename = "peggedUSD")]
    pub pegged_usd: f64,
}

/// One point of `GET /stablecoincharts/{chain}?stablecoin={id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StablecoinPoint {
    #[serde(default, rename = "totalCirculating")]
    pub total_circulating: PeggedAmount,
    #[serde(default, rename = "totalBridgedToUSD")]
    pub total_bridged_to_usd: PeggedAmount,
}
