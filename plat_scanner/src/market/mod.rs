//! warframe.market price lookups

mod client;
mod rate_limit;

pub use client::{MarketClient, MarketConfig, DEFAULT_CACHE_TTL, DEFAULT_MARKET_URL};
pub use rate_limit::{RateLimiter, DEFAULT_MIN_INTERVAL};

use async_trait::async_trait;
use plat_common::{LookupError, MarketQuote};

/// Resolves a slug to its current market data
///
/// Callers are responsible for pacing; see [`RateLimiter`].
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn lookup(&self, slug: &str) -> Result<MarketQuote, LookupError>;
}
