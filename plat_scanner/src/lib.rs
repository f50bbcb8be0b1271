//! PlatScanner - Warframe inventory screenshot scanner
//!
//! Screenshots go through a vision model to find prime parts and relics, each
//! new item is priced on warframe.market, and the results are kept in a local
//! inventory that survives between sessions.

pub mod config;
pub mod detector;
pub mod error;
pub mod image;
pub mod inventory;
pub mod market;
pub mod merge;
pub mod pricing;
pub mod queue;
pub mod report;
pub mod scanner;
pub mod storage;
pub mod web;

pub use config::{default_db_path, ScannerConfig};
pub use detector::{Detection, DetectorConfig, GeminiDetector, ItemDetector};
pub use error::{Error, Result, ScannerError};
pub use image::{ContentFingerprint, ImageSource};
pub use inventory::{InventoryEntry, InventoryRecord, InventoryStats, InventoryStore};
pub use market::{MarketClient, MarketConfig, PriceLookup, RateLimiter};
pub use pricing::Pricer;
pub use queue::{JobStatus, JobView, QueueSnapshot, ScanQueue, UploadOutcome};
pub use scanner::{RefreshSummary, Scanner};
pub use storage::{init_schema, KeyValueStore, MemoryStore, SqliteStore};
