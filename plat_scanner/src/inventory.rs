//! Persistent inventory of detected items
//!
//! One entry per item name, merged across scan sessions. The whole record is
//! serialized as JSON under a single storage key. The in-memory collection is
//! the record of truth: a failed write is logged and the session carries on.

use crate::merge::{merge_into_inventory, merge_price_refresh};
use crate::storage::{KeyValueStore, MemoryStore};
use chrono::{DateTime, Utc};
use plat_common::{DetectedItem, ItemCategory, ItemStatus};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub const INVENTORY_STORAGE_KEY: &str = "platscanner_inventory";
pub const LAST_SCAN_STORAGE_KEY: &str = "platscanner_last_scan";
pub const INVENTORY_VERSION: &str = "1.3.0";

/// Inventory store shared between the queue worker and commands
pub type SharedInventory = Arc<Mutex<InventoryStore>>;

/// A detected item with provenance and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    #[serde(flatten)]
    pub item: DetectedItem,
    /// First time this name was seen; never changes
    pub added_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_session: Option<String>,
}

impl InventoryEntry {
    pub fn name(&self) -> &str {
        &self.item.name
    }

    pub fn category(&self) -> ItemCategory {
        self.item.category
    }
}

impl AsRef<DetectedItem> for InventoryEntry {
    fn as_ref(&self) -> &DetectedItem {
        &self.item
    }
}

/// The persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub items: Vec<InventoryEntry>,
    pub last_scan_date: DateTime<Utc>,
    pub version: String,
}

impl InventoryRecord {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            last_scan_date: Utc::now(),
            version: INVENTORY_VERSION.to_string(),
        }
    }
}

/// Totals for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: ItemCategory,
    pub total_items: usize,
    pub total_value: u64,
    pub total_ducats: u64,
}

/// Totals across the inventory. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_items: usize,
    pub total_value: u64,
    pub total_ducats: u64,
    pub last_scan_date: DateTime<Utc>,
    pub by_category: Vec<CategoryStats>,
}

fn category_stats(entries: &[InventoryEntry], category: ItemCategory) -> CategoryStats {
    let in_category = entries.iter().filter(|e| e.category() == category);
    let mut stats = CategoryStats {
        category,
        total_items: 0,
        total_value: 0,
        total_ducats: 0,
    };
    for entry in in_category {
        stats.total_items += 1;
        stats.total_value += entry.item.platinum();
        stats.total_ducats += entry.item.ducat_value();
    }
    stats
}

/// Inventory store over a key-value backend
pub struct InventoryStore {
    storage: Box<dyn KeyValueStore>,
    record: InventoryRecord,
    last_error: Option<String>,
}

impl InventoryStore {
    /// Load the inventory from storage.
    ///
    /// A missing record starts empty; an unreadable one is logged and also
    /// starts empty.
    pub fn open(storage: Box<dyn KeyValueStore>) -> Self {
        let mut last_error = None;

        let record = match storage.get(INVENTORY_STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<InventoryRecord>(&json) {
                Ok(record) => {
                    log::info!("Loaded inventory with {} items", record.items.len());
                    record
                }
                Err(e) => {
                    log::error!("Failed to parse stored inventory, starting fresh: {}", e);
                    last_error = Some(e.to_string());
                    InventoryRecord::empty()
                }
            },
            Ok(None) => {
                log::info!("No stored inventory, starting empty");
                InventoryRecord::empty()
            }
            Err(e) => {
                log::error!("Failed to load inventory: {}", e);
                last_error = Some(e.to_string());
                InventoryRecord::empty()
            }
        };

        Self {
            storage,
            record,
            last_error,
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryStore::new()))
    }

    pub fn into_shared(self) -> SharedInventory {
        Arc::new(Mutex::new(self))
    }

    /// Snapshot of the full record
    pub fn load(&self) -> InventoryRecord {
        self.record.clone()
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.record.items
    }

    pub fn entries_in(&self, category: ItemCategory) -> Vec<InventoryEntry> {
        self.record
            .items
            .iter()
            .filter(|e| e.category() == category)
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&InventoryEntry> {
        self.record.items.iter().find(|e| e.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.record.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.items.is_empty()
    }

    pub fn last_scan_date(&self) -> DateTime<Utc> {
        self.record.last_scan_date
    }

    /// Totals over the live collection
    pub fn stats(&self) -> InventoryStats {
        let by_category: Vec<CategoryStats> = ItemCategory::ALL
            .iter()
            .map(|c| category_stats(&self.record.items, *c))
            .collect();

        InventoryStats {
            total_items: by_category.iter().map(|s| s.total_items).sum(),
            total_value: by_category.iter().map(|s| s.total_value).sum(),
            total_ducats: by_category.iter().map(|s| s.total_ducats).sum(),
            last_scan_date: self.record.last_scan_date,
            by_category,
        }
    }

    pub fn stats_for(&self, category: ItemCategory) -> CategoryStats {
        category_stats(&self.record.items, category)
    }

    /// Merge a batch of items. Without a session id a fresh `scan_<millis>` is used.
    pub fn upsert(&mut self, items: &[DetectedItem], session_id: Option<&str>) {
        if items.is_empty() {
            return;
        }

        let now = Utc::now();
        let session = session_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("scan_{}", now.timestamp_millis()));

        self.record.items = merge_into_inventory(&self.record.items, items, &session, now);
        self.record.last_scan_date = now;

        log::debug!(
            "Merged {} item(s) into inventory ({} total)",
            items.len(),
            self.record.items.len()
        );
        self.persist();
        self.persist_last_scan();
    }

    /// Remove one entry by name. Returns `false` if it wasn't there.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.record.items.len();
        let remaining: Vec<InventoryEntry> = self
            .record
            .items
            .iter()
            .filter(|e| e.name() != name)
            .cloned()
            .collect();

        if remaining.len() == before {
            return false;
        }

        self.record.items = remaining;
        self.record.last_scan_date = Utc::now();
        log::info!("Removed '{}' from inventory", name);
        self.persist();
        true
    }

    /// Remove every entry, or only those of one category. Returns the number removed.
    pub fn clear(&mut self, category: Option<ItemCategory>) -> usize {
        let before = self.record.items.len();

        match category {
            None => {
                self.record = InventoryRecord::empty();
                self.last_error = None;
                for key in [INVENTORY_STORAGE_KEY, LAST_SCAN_STORAGE_KEY] {
                    if let Err(e) = self.storage.remove(key) {
                        log::error!("Failed to clear inventory: {}", e);
                        self.last_error = Some(e.to_string());
                    }
                }
                log::info!("Cleared inventory ({} items)", before);
                before
            }
            Some(category) => {
                let remaining: Vec<InventoryEntry> = self
                    .record
                    .items
                    .iter()
                    .filter(|e| e.category() != category)
                    .cloned()
                    .collect();
                let removed = before - remaining.len();

                self.record.items = remaining;
                self.record.last_scan_date = Utc::now();
                log::info!("Cleared {} {} from inventory", removed, category.display_name());
                self.persist();
                removed
            }
        }
    }

    /// Apply fresh prices to entries that already exist. Returns the number updated.
    pub fn refresh_prices(&mut self, items: &[DetectedItem]) -> usize {
        let now = Utc::now();
        let (merged, updated) = merge_price_refresh(&self.record.items, items, now);

        if updated > 0 {
            self.record.items = merged;
            self.record.last_scan_date = now;
            self.persist();
        }
        updated
    }

    /// Flag an entry whose refresh failed so the failure stays visible
    pub fn mark_error(&mut self, name: &str, message: &str) -> bool {
        let Some(existing) = self.get(name) else {
            return false;
        };

        let mut failed = existing.item.clone();
        failed.status = ItemStatus::Error;
        failed.error = Some(message.to_string());
        self.refresh_prices(&[failed]) > 0
    }

    /// Message of the most recent storage failure, cleared by the next good write
    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.record)
            .map_err(crate::error::ScannerError::from)
            .and_then(|json| self.storage.set(INVENTORY_STORAGE_KEY, &json));

        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                log::error!("Failed to save inventory: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn persist_last_scan(&mut self) {
        let stamp = self.record.last_scan_date.to_rfc3339();
        if let Err(e) = self.storage.set(LAST_SCAN_STORAGE_KEY, &stamp) {
            log::error!("Failed to save last scan date: {}", e);
            self.last_error = Some(e.to_string());
        }
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
