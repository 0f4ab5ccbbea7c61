//! DefiLlama integration.
//!
//! Prices come from `coins.llama.fi`, chain and protocol TVL from
//! `api.llama.fi`, stablecoin circulation from `stablecoins.llama.fi`.

mod client;
mod summary;
pub mod types;

pub use client::{DefiLlamaClient, DefiLlamaConfig, MANTLE_CHAIN};
pub use summary::{HealthCategory, HealthScore, ProtocolSummary, SocialPresence, TvlSummary};
pub use types::{ChainTvlPoint, ProtocolInfo, StablecoinPoint, TokenPrice};
