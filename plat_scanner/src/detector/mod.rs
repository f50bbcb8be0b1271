//! Item detection from inventory screenshots
//!
//! The detector itself is an external vision model; this module defines the
//! boundary ([`ItemDetector`]) and the Gemini client behind it.

mod gemini;
mod parse;

pub use gemini::{DetectorConfig, GeminiDetector, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use parse::{is_error_response, parse_detections, parse_line};

use crate::image::ImageSource;
use async_trait::async_trait;
use plat_common::{DetectedItem, DetectionError, ItemCategory, RelicRarity};
use serde::Serialize;

/// One item named by the detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub name: String,
    pub category: ItemCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<RelicRarity>,
}

impl Detection {
    pub fn prime_part(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: ItemCategory::PrimePart,
            rarity: None,
        }
    }

    pub fn relic(name: impl Into<String>, rarity: Option<RelicRarity>) -> Self {
        Self {
            name: name.into(),
            category: ItemCategory::Relic,
            rarity,
        }
    }

    /// Unpriced item awaiting a market lookup
    pub fn into_item(self) -> DetectedItem {
        DetectedItem::new(self.name, self.category).with_rarity(self.rarity)
    }
}

/// Turns a screenshot into an ordered list of item names
#[async_trait]
pub trait ItemDetector: Send + Sync {
    /// Whether credentials are present. Checked before queueing uploads.
    fn is_ready(&self) -> bool;

    async fn detect(&self, image: &ImageSource) -> Result<Vec<Detection>, DetectionError>;
}
