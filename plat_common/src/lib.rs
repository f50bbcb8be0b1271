//! Shared types for PlatScanner
//!
//! Item and market types, the slug normalizer and the error types used at the
//! detector / price-lookup boundary.

pub mod error;
pub mod normalize;
pub mod sort;
pub mod types;

pub use error::{DetectionError, LookupError, ParseCategoryError};
pub use normalize::normalize_item_name;
pub use sort::{sort_items, SortDirection, SortField};
pub use types::{
    DetectedItem, ItemCategory, ItemStatus, MarketQuote, RelicRarity, ASSET_BASE_URL,
    NO_BUY_ORDERS,
};
