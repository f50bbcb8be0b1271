//! warframe.market v1 REST client
//!
//! Each lookup fetches the item detail and its order book concurrently and
//! reduces them to a [`MarketQuote`]. Quotes are cached per slug for a few
//! minutes so refreshes don't hammer the remote.

use super::PriceLookup;
use crate::error::Result;
use async_trait::async_trait;
use plat_common::{LookupError, MarketQuote};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_MARKET_URL: &str = "https://api.warframe.market/v1";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Endpoint and caching settings for [`MarketClient`]
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MARKET_URL.to_string(),
            timeout: Duration::from_secs(30),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

// ── wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ItemResponse {
    payload: ItemPayload,
}

#[derive(Debug, Deserialize)]
struct ItemPayload {
    item: ItemSet,
}

#[derive(Debug, Deserialize)]
struct ItemSet {
    #[serde(default)]
    items_in_set: Vec<SetItem>,
}

#[derive(Debug, Deserialize)]
struct SetItem {
    url_name: String,
    thumb: Option<String>,
    ducats: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    payload: OrdersPayload,
}

#[derive(Debug, Deserialize)]
struct OrdersPayload {
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
struct Order {
    order_type: String,
    platinum: f64,
    #[serde(default)]
    visible: bool,
    user: OrderUser,
}

#[derive(Debug, Deserialize)]
struct OrderUser {
    status: String,
    #[serde(default)]
    banned: bool,
}

impl Order {
    /// A buy order from a reachable, trustworthy user
    fn is_active_buy(&self) -> bool {
        self.order_type == "buy"
            && matches!(self.user.status.as_str(), "online" | "ingame")
            && !self.user.banned
            && self.visible
    }
}

/// Reduce an item detail and its order book to a quote
fn aggregate(
    slug: &str,
    item: ItemResponse,
    orders: OrdersResponse,
) -> std::result::Result<MarketQuote, LookupError> {
    let mut set = item.payload.item.items_in_set;
    let index = set.iter().position(|i| i.url_name == slug).unwrap_or(0);
    if set.is_empty() {
        return Err(LookupError::NotFound(slug.to_string()));
    }
    let detail = set.swap_remove(index);

    let all_orders = orders.payload.orders;
    let buy_prices: Vec<f64> = all_orders
        .iter()
        .filter(|o| o.is_active_buy())
        .map(|o| o.platinum)
        .collect();

    let price = buy_prices.iter().copied().fold(0.0_f64, f64::max);
    let average = if buy_prices.is_empty() {
        0.0
    } else {
        buy_prices.iter().sum::<f64>() / buy_prices.len() as f64
    };

    Ok(MarketQuote {
        price: price.round() as u32,
        ducats: detail.ducats.unwrap_or(0),
        volume: all_orders.len() as u32,
        average: average.round() as u32,
        thumbnail: detail.thumb,
    })
}

/// Price lookup against the warframe.market API
pub struct MarketClient {
    config: MarketConfig,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, (Instant, MarketQuote)>>,
}

impl MarketClient {
    pub fn new(config: MarketConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("PlatScanner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn cached(&self, slug: &str) -> Option<MarketQuote> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(slug)
            .filter(|(fetched_at, _)| fetched_at.elapsed() < self.config.cache_ttl)
            .map(|(_, quote)| quote.clone())
    }

    fn remember(&self, slug: &str, quote: &MarketQuote) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|_, (fetched_at, _)| fetched_at.elapsed() < self.config.cache_ttl);
            cache.insert(slug.to_string(), (Instant::now(), quote.clone()));
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        slug: &str,
    ) -> std::result::Result<T, LookupError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("Language", "en")
            .header("Platform", "pc")
            .send()
            .await
            .map_err(|e| LookupError::Transient(format!("request to {path} failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(LookupError::NotFound(slug.to_string())),
            status if !status.is_success() => {
                Err(LookupError::Transient(format!("{path} returned {status}")))
            }
            _ => response
                .json::<T>()
                .await
                .map_err(|e| LookupError::Transient(format!("invalid response from {path}: {e}"))),
        }
    }
}

#[async_trait]
impl PriceLookup for MarketClient {
    async fn lookup(&self, slug: &str) -> std::result::Result<MarketQuote, LookupError> {
        if slug.is_empty() {
            return Err(LookupError::NotFound(slug.to_string()));
        }

        if let Some(quote) = self.cached(slug) {
            log::debug!("Market cache hit for {}", slug);
            return Ok(quote);
        }

        let item_path = format!("items/{slug}");
        let orders_path = format!("items/{slug}/orders");
        let (item, orders) = tokio::try_join!(
            self.get_json::<ItemResponse>(&item_path, slug),
            self.get_json::<OrdersResponse>(&orders_path, slug),
        )?;

        let quote = aggregate(slug, item, orders)?;
        log::debug!(
            "{}: {}p best buy, {}p average, {} orders",
            slug,
            quote.price,
            quote.average,
            quote.volume
        );

        self.remember(slug, &quote);
        Ok(quote)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
