//! Upstream data clients.
//!
//! Read-only lookups used by the mantle-mcp tools:
//! - DefiLlama: token prices, chain TVL history, protocol summaries,
//!   stablecoin circulation on Mantle
//! - Recoup: artist fans, posts and social profiles

pub mod defillama;
mod error;
mod http;
pub mod pagination;
pub mod recoup;

pub use defillama::{DefiLlamaClient, DefiLlamaConfig};
pub use error::DataError;
pub use pagination::PageQuery;
pub use recoup::{RecoupClient, RecoupConfig};
