//! Command facade shared by the CLI and the JSON API
//!
//! Wires the detector, market client, rate limiter, inventory store and
//! queue together and exposes the user-facing commands.

use crate::config::ScannerConfig;
use crate::detector::{GeminiDetector, ItemDetector};
use crate::error::{Result, ScannerError};
use crate::image::ImageSource;
use crate::inventory::{InventoryEntry, InventoryRecord, InventoryStats, InventoryStore, SharedInventory};
use crate::market::{MarketClient, PriceLookup, RateLimiter};
use crate::pricing::Pricer;
use crate::queue::{QueueSnapshot, ScanQueue, UploadOutcome};
use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};
use plat_common::{sort_items, ItemCategory, SortDirection, SortField};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

/// Outcome of refreshing a whole category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub category: Option<ItemCategory>,
    pub updated: usize,
    /// Names whose lookup kept failing; they are now marked `error`
    pub failed: Vec<String>,
}

pub struct Scanner {
    queue: ScanQueue,
    inventory: SharedInventory,
    pricer: Pricer,
}

impl Scanner {
    pub fn new(
        detector: Arc<dyn ItemDetector>,
        lookup: Arc<dyn PriceLookup>,
        inventory: InventoryStore,
        rate_limit: Duration,
        lookup_retries: u32,
    ) -> Self {
        // One limiter for queue and refresh traffic alike
        let limiter = Arc::new(RateLimiter::new(rate_limit));
        let pricer = Pricer::new(lookup, limiter, lookup_retries);
        let inventory = inventory.into_shared();
        let queue = ScanQueue::new(detector, pricer.clone(), inventory.clone());

        Self {
            queue,
            inventory,
            pricer,
        }
    }

    /// Build the scanner with the Gemini and warframe.market clients
    pub fn from_config(config: &ScannerConfig) -> Result<Self> {
        let storage: Box<dyn KeyValueStore> = match &config.database {
            Some(path) => {
                log::info!("Database path: {}", path.display());
                Box::new(SqliteStore::open(path)?)
            }
            None => {
                log::info!("Using in-memory inventory");
                Box::new(MemoryStore::new())
            }
        };

        let detector = Arc::new(GeminiDetector::new(config.detector.clone())?);
        let market = Arc::new(MarketClient::new(config.market.clone())?);

        Ok(Self::new(
            detector,
            market,
            InventoryStore::open(storage),
            config.rate_limit,
            config.lookup_retries,
        ))
    }

    fn store(&self) -> MutexGuard<'_, InventoryStore> {
        self.inventory.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn queue(&self) -> &ScanQueue {
        &self.queue
    }

    pub fn is_ready(&self) -> bool {
        self.queue.is_ready()
    }

    // ── queue commands ──────────────────────────────────────────────

    pub fn upload(&self, images: Vec<ImageSource>) -> Result<UploadOutcome> {
        self.queue.upload(images)
    }

    /// Read screenshots from disk and queue them.
    ///
    /// Every file is read first, so one unsupported file rejects the whole batch.
    pub fn upload_paths(&self, paths: &[PathBuf]) -> Result<UploadOutcome> {
        let images = paths
            .iter()
            .map(|path| ImageSource::from_path(path))
            .collect::<Result<Vec<_>>>()?;
        self.queue.upload(images)
    }

    pub fn select_active(&self, id: &str) -> Result<()> {
        self.queue.select(id)
    }

    pub fn remove_image(&self, id: &str) -> Result<()> {
        self.queue.remove(id)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await
    }

    // ── inventory commands ──────────────────────────────────────────

    pub fn inventory(&self) -> InventoryRecord {
        self.store().load()
    }

    pub fn stats(&self) -> InventoryStats {
        self.store().stats()
    }

    /// Most recent storage failure, `None` once a write succeeds again
    pub fn persistence_error(&self) -> Option<String> {
        self.store().last_persistence_error().map(str::to_string)
    }

    /// Inventory entries, optionally of one category, sorted for display
    pub fn inventory_view(
        &self,
        category: Option<ItemCategory>,
        field: SortField,
        direction: SortDirection,
    ) -> Vec<InventoryEntry> {
        let mut entries: Vec<InventoryEntry> = match category {
            Some(category) => self.store().entries_in(category),
            None => self.store().entries().to_vec(),
        };
        sort_items(&mut entries, field, direction);
        entries
    }

    pub fn remove_inventory_item(&self, name: &str) -> Result<()> {
        if self.store().remove(name) {
            Ok(())
        } else {
            Err(ScannerError::UnknownItem(name.to_string()))
        }
    }

    /// Delete one category, or everything. Returns the number removed.
    pub fn clear_category(&self, category: Option<ItemCategory>) -> usize {
        self.store().clear(category)
    }

    /// Re-price one inventory entry
    pub async fn refresh_item(&self, name: &str) -> Result<InventoryEntry> {
        let item = self
            .store()
            .get(name)
            .map(|entry| entry.item.clone())
            .ok_or_else(|| ScannerError::UnknownItem(name.to_string()))?;

        log::info!("Refreshing price for {}", name);
        let priced = self.pricer.price(item).await;
        self.apply_refresh(&priced);

        self.store()
            .get(name)
            .cloned()
            .ok_or_else(|| ScannerError::UnknownItem(name.to_string()))
    }

    /// Re-price every entry of a category, one request at a time
    pub async fn refresh_category(&self, category: ItemCategory) -> Result<RefreshSummary> {
        let items: Vec<_> = self
            .store()
            .entries_in(category)
            .into_iter()
            .map(|entry| entry.item)
            .collect();

        log::info!("Refreshing {} {}", items.len(), category.display_name());

        let mut summary = RefreshSummary {
            category: Some(category),
            ..RefreshSummary::default()
        };
        for item in items {
            let priced = self.pricer.price(item).await;
            if self.apply_refresh(&priced) {
                if priced.is_loaded() {
                    summary.updated += 1;
                } else {
                    summary.failed.push(priced.name.clone());
                }
            }
        }

        log::info!(
            "Refreshed {} {} ({} failed)",
            summary.updated,
            category.display_name(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Write a refresh result back. `false` if the entry has since been removed.
    fn apply_refresh(&self, priced: &plat_common::DetectedItem) -> bool {
        let mut store = self.store();
        if priced.is_loaded() {
            store.refresh_prices(std::slice::from_ref(priced)) > 0
        } else {
            let message = priced.error.as_deref().unwrap_or("price lookup failed");
            store.mark_error(&priced.name, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Detection;
    use async_trait::async_trait;
    use plat_common::{DetectedItem, DetectionError, ItemStatus, LookupError, MarketQuote};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct NoDetector;

    #[async_trait]
    impl ItemDetector for NoDetector {
        fn is_ready(&self) -> bool {
            true
        }

        async fn detect(
            &self,
            _image: &ImageSource,
        ) -> std::result::Result<Vec<Detection>, DetectionError> {
            Ok(Vec::new())
        }
    }

    /// Prices that can be changed between calls
    #[derive(Default)]
    struct Board {
        prices: Mutex<HashMap<String, std::result::Result<MarketQuote, LookupError>>>,
    }

    impl Board {
        fn set(&self, slug: &str, result: std::result::Result<MarketQuote, LookupError>) {
            self.prices
                .lock()
                .unwrap()
                .insert(slug.to_string(), result);
        }
    }

    #[async_trait]
    impl PriceLookup for Board {
        async fn lookup(&self, slug: &str) -> std::result::Result<MarketQuote, LookupError> {
            self.prices
                .lock()
                .unwrap()
                .get(slug)
                .cloned()
                .unwrap_or_else(|| Err(LookupError::NotFound(slug.to_string())))
        }
    }

    fn priced(price: u32) -> std::result::Result<MarketQuote, LookupError> {
        Ok(MarketQuote {
            price,
            ducats: 15,
            volume: 4,
            average: price,
            thumbnail: None,
        })
    }

    fn scanner_with(board: Arc<Board>) -> Scanner {
        let mut store = InventoryStore::in_memory();
        let mut items = Vec::new();
        for (name, category, price) in [
            ("Mirage Prime Blueprint", ItemCategory::PrimePart, 35),
            ("Kronen Prime Blade", ItemCategory::PrimePart, 12),
            ("Lith A1 Relic", ItemCategory::Relic, 4),
        ] {
            let mut item = DetectedItem::new(name, category);
            item.apply_quote(&priced(price).unwrap());
            items.push(item);
        }
        store.upsert(&items, Some("scan_1"));

        Scanner::new(Arc::new(NoDetector), board, store, Duration::ZERO, 0)
    }

    #[tokio::test]
    async fn refresh_item_updates_price_and_keeps_provenance() {
        let board = Arc::new(Board::default());
        board.set("kronen_prime_blade", priced(20));
        let scanner = scanner_with(board);
        let before = scanner.inventory().items[1].clone();

        let entry = scanner.refresh_item("Kronen Prime Blade").await.unwrap();

        assert_eq!(entry.item.price, Some(20));
        assert_eq!(entry.added_at, before.added_at);
        assert_eq!(entry.scan_session.as_deref(), Some("scan_1"));
    }

    #[tokio::test]
    async fn failed_refresh_marks_entry_error() {
        let board = Arc::new(Board::default());
        board.set(
            "kronen_prime_blade",
            Err(LookupError::Transient("503".into())),
        );
        let scanner = scanner_with(board);

        let entry = scanner.refresh_item("Kronen Prime Blade").await.unwrap();
        assert_eq!(entry.item.status, ItemStatus::Error);
        assert_eq!(entry.item.price, Some(12));
    }

    #[tokio::test]
    async fn refresh_unknown_item_is_an_error() {
        let scanner = scanner_with(Arc::new(Board::default()));
        assert!(matches!(
            scanner.refresh_item("Nope Prime").await,
            Err(ScannerError::UnknownItem(_))
        ));
    }

    #[tokio::test]
    async fn refresh_category_touches_only_that_category() {
        let board = Arc::new(Board::default());
        board.set("lith_a1_relic", priced(9));
        board.set("mirage_prime_blueprint", priced(99));
        let scanner = scanner_with(board);

        let summary = scanner
            .refresh_category(ItemCategory::Relic)
            .await
            .unwrap();

        assert_eq!(summary.updated, 1);
        assert!(summary.failed.is_empty());
        let record = scanner.inventory();
        let price_of = |name: &str| record.items.iter().find(|e| e.name() == name).unwrap().item.price;
        assert_eq!(price_of("Lith A1 Relic"), Some(9));
        assert_eq!(price_of("Mirage Prime Blueprint"), Some(35));
    }

    #[tokio::test]
    async fn refresh_category_reports_failures() {
        let board = Arc::new(Board::default());
        board.set("mirage_prime_blueprint", priced(40));
        board.set(
            "kronen_prime_blade",
            Err(LookupError::Transient("timeout".into())),
        );
        let scanner = scanner_with(board);

        let summary = scanner
            .refresh_category(ItemCategory::PrimePart)
            .await
            .unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, ["Kronen Prime Blade"]);
    }

    #[test]
    fn clear_category_leaves_other_category() {
        let scanner = scanner_with(Arc::new(Board::default()));
        let primes = scanner.stats().by_category[0].clone();

        assert_eq!(scanner.clear_category(Some(ItemCategory::Relic)), 1);
        assert_eq!(scanner.stats().by_category[0], primes);
        assert_eq!(scanner.stats().total_items, 2);
    }

    #[test]
    fn remove_inventory_item_requires_existing_name() {
        let scanner = scanner_with(Arc::new(Board::default()));
        scanner.remove_inventory_item("Lith A1 Relic").unwrap();
        assert!(matches!(
            scanner.remove_inventory_item("Lith A1 Relic"),
            Err(ScannerError::UnknownItem(_))
        ));
    }

    #[test]
    fn inventory_view_sorts_and_filters() {
        let scanner = scanner_with(Arc::new(Board::default()));

        let by_price = scanner.inventory_view(None, SortField::Price, SortDirection::Descending);
        let names: Vec<&str> = by_price.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            ["Mirage Prime Blueprint", "Kronen Prime Blade", "Lith A1 Relic"]
        );

        let primes = scanner.inventory_view(
            Some(ItemCategory::PrimePart),
            SortField::Name,
            SortDirection::Ascending,
        );
        let names: Vec<&str> = primes.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["Kronen Prime Blade", "Mirage Prime Blueprint"]);
    }

    #[test]
    fn upload_paths_rejects_unsupported_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("a.png");
        let bad = dir.path().join("notes.txt");
        std::fs::write(&good, [1u8, 2, 3]).unwrap();
        std::fs::write(&bad, "hi").unwrap();

        let scanner = scanner_with(Arc::new(Board::default()));
        assert!(matches!(
            scanner.upload_paths(&[good, bad]),
            Err(ScannerError::UnsupportedImage(_))
        ));
        assert!(scanner.snapshot().jobs.is_empty());
    }
}
