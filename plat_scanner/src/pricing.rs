//! Pricing detected items through the rate-limited market lookup

use crate::market::{PriceLookup, RateLimiter};
use plat_common::{normalize_item_name, DetectedItem, LookupError, MarketQuote};
use std::sync::Arc;

pub const DEFAULT_LOOKUP_RETRIES: u32 = 2;

/// Looks up prices one item at a time, paced by the shared limiter
#[derive(Clone)]
pub struct Pricer {
    lookup: Arc<dyn PriceLookup>,
    limiter: Arc<RateLimiter>,
    retries: u32,
}

impl Pricer {
    pub fn new(lookup: Arc<dyn PriceLookup>, limiter: Arc<RateLimiter>, retries: u32) -> Self {
        Self {
            lookup,
            limiter,
            retries,
        }
    }

    /// Quote for a display name. Transient failures are retried, each
    /// attempt taking its own rate-limit slot.
    pub async fn quote(&self, name: &str) -> Result<MarketQuote, LookupError> {
        let slug = normalize_item_name(name);
        let mut attempt = 0;

        loop {
            self.limiter.acquire().await;
            match self.lookup.lookup(&slug).await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "Lookup for {} failed ({}), retry {}/{}",
                        slug,
                        e,
                        attempt,
                        self.retries
                    );
                }
                result => return result,
            }
        }
    }

    /// Attach market data to an item.
    ///
    /// An unlisted item ends up loaded at 0p with the "no buy orders" reason;
    /// only a lookup that keeps failing leaves it in `error`.
    pub async fn price(&self, mut item: DetectedItem) -> DetectedItem {
        match self.quote(&item.name).await {
            Ok(quote) => item.apply_quote(&quote),
            Err(LookupError::NotFound(slug)) => {
                log::info!("{} is not listed on the market", slug);
                item.mark_not_listed();
            }
            Err(e) => {
                log::warn!("Giving up on {}: {}", item.name, e);
                item.mark_failed(e.to_string());
            }
        }
        item
    }
}
