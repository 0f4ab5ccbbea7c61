//! DefiLlama REST client.

use std::time::Duration;

use reqwest::Url;

use super::summary::{ProtocolSummary, TvlSummary};
use super::types::{ChainTvlPoint, PricesResponse, ProtocolInfo, StablecoinPoint, TokenPrice};
use crate::error::DataError;
use crate::http::{build_client, get_json, normalise_base_url};

/// Chain name used by the DefiLlama APIs for Mantle.
pub const MANTLE_CHAIN: &str = "Mantle";

/// Coin-id prefix for Mantle token addresses.
const MANTLE_COIN_PREFIX: &str = "mantle";

/// Endpoints for the three DefiLlama hosts.
#[derive(Debug, Clone)]
pub struct DefiLlamaConfig {
    pub coins_base_url: String,
    pub api_base_url: String,
    pub stablecoins_base_url: String,
    pub timeout: Duration,
}

impl Default for DefiLlamaConfig {
    fn default() -> Self {
        Self {
            coins_base_url: "https://coins.llama.fi".into(),
            api_base_url: "https://api.llama.fi".into(),
            stablecoins_base_url: "https://stablecoins.llama.fi".into(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// DefiLlama client scoped to the Mantle chain.
#[derive(Debug, Clone)]
pub struct DefiLlamaClient {
    http: reqwest::Client,
    coins_base_url: String,
    api_base_url: String,
    stablecoins_base_url: String,
}

impl DefiLlamaClient {
    pub fn new(config: &DefiLlamaConfig) -> Result<Self, DataError> {
        Ok(Self {
            http: build_client(config.timeout)?,
            coins_base_url: normalise_base_url("coins_base_url", &config.coins_base_url)?,
            api_base_url: normalise_base_url("api_base_url", &config.api_base_url)?,
            stablecoins_base_url: normalise_base_url(
                "stablecoins_base_url",
                &config.stablecoins_base_url,
            )?,
        })
    }

    fn url(base: &str, path: &str) -> Result<Url, DataError> {
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| DataError::Config(format!("Invalid URL {base}{path}: {e}")))
    }

    /// Current price of a Mantle token by contract address.
    pub async fn token_price(&self, contract_address: &str) -> Result<TokenPrice, DataError> {
        let address = contract_address.trim();
        if address.is_empty() || address.contains(['/', ',', '?', '#']) {
            return Err(DataError::Validation(format!(
                "invalid contract address: {contract_address:?}"
            )));
        }
        let coin = format!("{MANTLE_COIN_PREFIX}:{address}");
        let url = Self::url(&self.coins_base_url, &format!("/prices/current/{coin}"))?;
        let mut resp: PricesResponse = get_json(&self.http, url).await?;

        // The API echoes the coin id, but may normalise address case.
        let key = resp
            .coins
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&coin))
            .cloned();
        key.and_then(|k| resp.coins.remove(&k))
            .ok_or_else(|| DataError::NotFound(format!("no price for {coin}")))
    }

    /// Daily TVL history of the Mantle chain, oldest first.
    pub async fn chain_tvl_history(&self) -> Result<Vec<ChainTvlPoint>, DataError> {
        let url = Self::url(
            &self.api_base_url,
            &format!("/v2/historicalChainTvl/{MANTLE_CHAIN}"),
        )?;
        get_json(&self.http, url).await
    }

    /// Latest Mantle TVL with daily and weekly change.
    pub async fn chain_tvl_summary(&self) -> Result<TvlSummary, DataError> {
        let history = self.chain_tvl_history().await?;
        TvlSummary::from_history(&history)
            .ok_or_else(|| DataError::Upstream("empty TVL history".into()))
    }

    /// Raw protocol record by DefiLlama slug.
    pub async fn protocol(&self, slug: &str) -> Result<ProtocolInfo, DataError> {
        if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DataError::Validation(format!("invalid protocol slug: {slug:?}")));
        }
        let url = Self::url(&self.api_base_url, &format!("/protocol/{slug}"))?;
        get_json(&self.http, url).await
    }

    /// Key metrics for a protocol on Mantle.
    pub async fn protocol_summary(&self, slug: &str) -> Result<ProtocolSummary, DataError> {
        let info = self.protocol(slug).await?;
        Ok(ProtocolSummary::from_info(&info, MANTLE_CHAIN))
    }

    /// Circulation history of one stablecoin on Mantle, oldest first.
    pub async fn stablecoin_history(
        &self,
        stablecoin_id: u32,
    ) -> Result<Vec<StablecoinPoint>, DataError> {
        let mut url = Self::url(
            &self.stablecoins_base_url,
            &format!("/stablecoincharts/{MANTLE_CHAIN}"),
        )?;
        url.query_pairs_mut()
            .append_pair("stablecoin", &stablecoin_id.to_string());
        get_json(&self.http, url).await
    }

    /// Latest bridged USD value of one stablecoin on Mantle.
    pub async fn stablecoin_tvl(&self, stablecoin_id: u32) -> Result<f64, DataError> {
        let history = self.stablecoin_history(stablecoin_id).await?;
        history
            .last()
            .map(|p| p.total_bridged_to_usd.pegged_usd)
            .ok_or_else(|| DataError::Upstream(format!("no data for stablecoin {stablecoin_id}")))
    }
}
