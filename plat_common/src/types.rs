//! Item and market types

use crate::error::ParseCategoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base URL for market thumbnail assets
pub const ASSET_BASE_URL: &str = "https://warframe.market/static/assets/";

/// Reason attached to items that priced at zero or have no listing
pub const NO_BUY_ORDERS: &str = "No active buy orders";

/// Inventory category of a detected item
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    #[default]
    PrimePart,
    Relic,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 2] = [ItemCategory::PrimePart, ItemCategory::Relic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::PrimePart => "prime_part",
            ItemCategory::Relic => "relic",
        }
    }

    /// Human readable section title
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemCategory::PrimePart => "Prime Parts",
            ItemCategory::Relic => "Void Relics",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "prime_part" | "prime_parts" | "prime" | "primes" => Ok(ItemCategory::PrimePart),
            "relic" | "relics" | "void_relic" | "void_relics" => Ok(ItemCategory::Relic),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}

/// Refinement level of a Void Relic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelicRarity {
    Intact,
    Exceptional,
    Flawless,
    Radiant,
}

impl RelicRarity {
    /// Case-insensitive lookup by refinement name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "intact" => Some(RelicRarity::Intact),
            "exceptional" => Some(RelicRarity::Exceptional),
            "flawless" => Some(RelicRarity::Flawless),
            "radiant" => Some(RelicRarity::Radiant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelicRarity::Intact => "intact",
            RelicRarity::Exceptional => "exceptional",
            RelicRarity::Flawless => "flawless",
            RelicRarity::Radiant => "radiant",
        }
    }
}

impl fmt::Display for RelicRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing status of a detected item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Loading,
    Loaded,
    Error,
}

/// Market data for one slug as returned by the price lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Highest active buy order in platinum, 0 when there are none
    pub price: u32,
    pub ducats: u32,
    /// Number of orders of any kind
    pub volume: u32,
    /// Rounded mean of active buy orders
    pub average: u32,
    /// Thumbnail asset path relative to [`ASSET_BASE_URL`]
    pub thumbnail: Option<String>,
}

impl MarketQuote {
    /// Absolute thumbnail URL
    pub fn thumbnail_url(&self) -> Option<String> {
        self.thumbnail
            .as_deref()
            .filter(|thumb| !thumb.is_empty())
            .map(|thumb| {
                if thumb.starts_with("http://") || thumb.starts_with("https://") {
                    thumb.to_string()
                } else {
                    format!("{ASSET_BASE_URL}{}", thumb.trim_start_matches('/'))
                }
            })
    }
}

/// An item found in a screenshot, optionally priced
///
/// Identity is the name: two items with the same name are the same
/// inventory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedItem {
    pub name: String,
    /// Records written before relic support carry no category
    #[serde(default)]
    pub category: ItemCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<RelicRarity>,
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub ducats: Option<u32>,
    #[serde(default)]
    pub volume: Option<u32>,
    #[serde(default)]
    pub average: Option<u32>,
    #[serde(default, rename = "imgUrl")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectedItem {
    pub fn new(name: impl Into<String>, category: ItemCategory) -> Self {
        Self {
            name: name.into(),
            category,
            rarity: None,
            price: None,
            ducats: None,
            volume: None,
            average: None,
            thumbnail: None,
            status: ItemStatus::Loading,
            error: None,
        }
    }

    pub fn with_rarity(mut self, rarity: Option<RelicRarity>) -> Self {
        self.rarity = rarity;
        self
    }

    /// Copy market data onto the item. A zero price is a valid result.
    pub fn apply_quote(&mut self, quote: &MarketQuote) {
        self.price = Some(quote.price);
        self.ducats = Some(quote.ducats);
        self.volume = Some(quote.volume);
        self.average = Some(quote.average);
        self.thumbnail = quote.thumbnail_url();
        self.status = ItemStatus::Loaded;
        self.error = (quote.price == 0).then(|| NO_BUY_ORDERS.to_string());
    }

    /// The market has no listing: terminal, shown as "no active buy orders"
    pub fn mark_not_listed(&mut self) {
        self.price = Some(0);
        self.status = ItemStatus::Loaded;
        self.error = Some(NO_BUY_ORDERS.to_string());
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = ItemStatus::Error;
        self.error = Some(message.into());
    }

    pub fn is_loaded(&self) -> bool {
        self.status == ItemStatus::Loaded
    }

    /// Platinum value, 0 when unpriced
    pub fn platinum(&self) -> u64 {
        u64::from(self.price.unwrap_or(0))
    }

    /// Ducat value, 0 when unknown
    pub fn ducat_value(&self) -> u64 {
        u64::from(self.ducats.unwrap_or(0))
    }
}

impl AsRef<DetectedItem> for DetectedItem {
    fn as_ref(&self) -> &DetectedItem {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: u32) -> MarketQuote {
        MarketQuote {
            price,
            ducats: 45,
            volume: 12,
            average: price,
            thumbnail: Some("items/images/en/thumbs/mirage_prime_blueprint.png".into()),
        }
    }

    #[test]
    fn category_parses_singular_and_plural() {
        assert_eq!("relics".parse::<ItemCategory>().unwrap(), ItemCategory::Relic);
        assert_eq!("Relic".parse::<ItemCategory>().unwrap(), ItemCategory::Relic);
        assert_eq!(
            "prime_parts".parse::<ItemCategory>().unwrap(),
            ItemCategory::PrimePart
        );
        assert_eq!(
            "prime-part".parse::<ItemCategory>().unwrap(),
            ItemCategory::PrimePart
        );
        assert!("mods".parse::<ItemCategory>().is_err());
    }

    #[test]
    fn apply_quote_with_price() {
        let mut item = DetectedItem::new("Mirage Prime Blueprint", ItemCategory::PrimePart);
        item.apply_quote(&quote(35));

        assert_eq!(item.price, Some(35));
        assert_eq!(item.ducats, Some(45));
        assert_eq!(item.status, ItemStatus::Loaded);
        assert!(item.error.is_none());
        assert_eq!(
            item.thumbnail.as_deref(),
            Some("https://warframe.market/static/assets/items/images/en/thumbs/mirage_prime_blueprint.png")
        );
    }

    #[test]
    fn apply_quote_with_zero_price_keeps_reason() {
        let mut item = DetectedItem::new("Lith A1 Relic", ItemCategory::Relic);
        item.apply_quote(&quote(0));

        assert_eq!(item.price, Some(0));
        assert_eq!(item.status, ItemStatus::Loaded);
        assert_eq!(item.error.as_deref(), Some(NO_BUY_ORDERS));
    }

    #[test]
    fn not_listed_is_loaded_not_error() {
        let mut item = DetectedItem::new("Unknown Prime Thing", ItemCategory::PrimePart);
        item.mark_not_listed();
        assert!(item.is_loaded());
        assert_eq!(item.price, Some(0));
    }

    #[test]
    fn thumbnail_url_keeps_absolute_urls() {
        let mut q = quote(1);
        q.thumbnail = Some("https://cdn.example.com/a.png".into());
        assert_eq!(q.thumbnail_url().as_deref(), Some("https://cdn.example.com/a.png"));

        q.thumbnail = Some(String::new());
        assert!(q.thumbnail_url().is_none());
    }

    #[test]
    fn legacy_record_without_category_loads_as_prime_part() {
        let json = r#"{
            "id": "img-1-part-0",
            "name": "Kronen Prime Blade",
            "imgUrl": "https://warframe.market/static/assets/x.png",
            "price": 12,
            "ducats": 15,
            "status": "loaded"
        }"#;

        let item: DetectedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.category, ItemCategory::PrimePart);
        assert_eq!(item.price, Some(12));
        assert!(item.volume.is_none());
        assert_eq!(item.thumbnail.as_deref(), Some("https://warframe.market/static/assets/x.png"));
    }

    #[test]
    fn serializes_with_camel_case_wire_names() {
        let item = DetectedItem::new("Axi A1 Relic", ItemCategory::Relic)
            .with_rarity(Some(RelicRarity::Radiant));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["category"], "relic");
        assert_eq!(json["rarity"], "radiant");
        assert_eq!(json["status"], "loading");
        assert!(json.get("imgUrl").is_some());
        assert!(json.get("error").is_none());
    }
}
