//! Reconciliation policies for detected items
//!
//! Two different rules, kept apart on purpose:
//! - [`merge_best_price`]: the combined results view of a scan. Highest price
//!   wins and an unpriced item never replaces a priced one.
//! - [`merge_into_inventory`]: the persisted inventory. Newest write wins,
//!   `added_at` is carried over.

use crate::inventory::InventoryEntry;
use chrono::{DateTime, Utc};
use plat_common::DetectedItem;

/// Merge one item into a combined view keyed by name.
///
/// Returns `true` if the view changed.
pub fn merge_best_price(view: &mut Vec<DetectedItem>, item: &DetectedItem) -> bool {
    match view.iter_mut().find(|existing| existing.name == item.name) {
        None => {
            view.push(item.clone());
            true
        }
        Some(existing) => {
            let better = match (item.price, existing.price) {
                (Some(_), None) => true,
                (Some(new), Some(old)) => new > old,
                (None, _) => false,
            };
            if better {
                *existing = item.clone();
            }
            better
        }
    }
}

/// Build a combined view from any number of detections, in first-seen order.
pub fn combine_best_price<'a>(
    items: impl IntoIterator<Item = &'a DetectedItem>,
) -> Vec<DetectedItem> {
    let mut view = Vec::new();
    for item in items {
        merge_best_price(&mut view, item);
    }
    view
}

/// Upsert a batch into the inventory collection, returning the new collection.
///
/// Existing names are replaced by the incoming data with `added_at` preserved;
/// new names are appended with `added_at = last_updated = now`. A name that
/// appears twice in the batch ends up as a single entry holding the later data.
pub fn merge_into_inventory(
    entries: &[InventoryEntry],
    items: &[DetectedItem],
    session_id: &str,
    now: DateTime<Utc>,
) -> Vec<InventoryEntry> {
    let mut merged = entries.to_vec();

    for item in items {
        let incoming = InventoryEntry {
            item: item.clone(),
            added_at: now,
            last_updated: now,
            scan_session: Some(session_id.to_string()),
        };

        match merged.iter().position(|e| e.item.name == item.name) {
            Some(index) => {
                let added_at = merged[index].added_at;
                merged[index] = InventoryEntry {
                    added_at,
                    ..incoming
                };
            }
            None => merged.push(incoming),
        }
    }

    merged
}

/// Apply fresh price data to existing entries only.
///
/// Touches the price-bearing fields, status and error; name, category,
/// rarity, `added_at` and `scan_session` are kept. Returns the new
/// collection and the number of entries updated.
pub fn merge_price_refresh(
    entries: &[InventoryEntry],
    items: &[DetectedItem],
    now: DateTime<Utc>,
) -> (Vec<InventoryEntry>, usize) {
    let mut updated = 0;

    let merged = entries
        .iter()
        .map(|entry| match items.iter().find(|i| i.name == entry.item.name) {
            Some(fresh) => {
                updated += 1;
                let mut entry = entry.clone();
                entry.item.price = fresh.price;
                entry.item.ducats = fresh.ducats;
                entry.item.volume = fresh.volume;
                entry.item.average = fresh.average;
                entry.item.thumbnail = fresh.thumbnail.clone();
                entry.item.status = fresh.status;
                entry.item.error = fresh.error.clone();
                entry.last_updated = now;
                entry
            }
            None => entry.clone(),
        })
        .collect();

    (merged, updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use plat_common::{ItemCategory, ItemStatus};

    fn priced(name: &str, price: Option<u32>) -> DetectedItem {
        let mut item = DetectedItem::new(name, ItemCategory::PrimePart);
        item.price = price;
        item.status = ItemStatus::Loaded;
        item
    }

    // ── merge_best_price ────────────────────────────────────────────────

    #[test]
    fn best_price_keeps_highest() {
        let view = combine_best_price(&[
            priced("Ash Prime Systems", Some(10)),
            priced("Ash Prime Systems", Some(25)),
            priced("Ash Prime Systems", Some(15)),
        ]);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].price, Some(25));
    }

    #[test]
    fn best_price_unpriced_never_overrides_priced() {
        let mut view = vec![priced("Ash Prime Systems", Some(10))];
        assert!(!merge_best_price(&mut view, &priced("Ash Prime Systems", None)));
        assert_eq!(view[0].price, Some(10));
    }

    #[test]
    fn best_price_priced_replaces_unpriced_even_at_zero() {
        let mut view = vec![priced("Lith A1 Relic", None)];
        assert!(merge_best_price(&mut view, &priced("Lith A1 Relic", Some(0))));
        assert_eq!(view[0].price, Some(0));
    }

    #[test]
    fn best_price_is_monotonic_over_any_order() {
        let candidates = [Some(3), None, Some(40), Some(0), None, Some(39), Some(40)];
        // Rotate the candidate order to exercise every starting point
        for start in 0..candidates.len() {
            let mut view = Vec::new();
            for offset in 0..candidates.len() {
                let price = candidates[(start + offset) % candidates.len()];
                merge_best_price(&mut view, &priced("Nikana Prime Blade", price));
            }
            assert_eq!(view.len(), 1);
            assert_eq!(view[0].price, Some(40), "start at {start}");
        }
    }

    #[test]
    fn best_price_preserves_first_seen_order() {
        let view = combine_best_price(&[
            priced("B", Some(1)),
            priced("A", Some(1)),
            priced("B", Some(5)),
        ]);
        let names: Vec<_> = view.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    // ── merge_into_inventory ────────────────────────────────────────────

    #[test]
    fn inventory_merge_appends_new_names() {
        let now = Utc::now();
        let merged = merge_into_inventory(&[], &[priced("A", Some(1))], "scan_1", now);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].added_at, now);
        assert_eq!(merged[0].last_updated, now);
        assert_eq!(merged[0].scan_session.as_deref(), Some("scan_1"));
    }

    #[test]
    fn inventory_merge_replaces_and_keeps_added_at() {
        let first = Utc::now() - Duration::days(3);
        let later = Utc::now();

        let entries = merge_into_inventory(&[], &[priced("A", Some(50))], "scan_1", first);
        let merged = merge_into_inventory(&entries, &[priced("A", Some(20))], "scan_2", later);

        assert_eq!(merged.len(), 1);
        // Newest write wins even when the price went down
        assert_eq!(merged[0].item.price, Some(20));
        assert_eq!(merged[0].added_at, first);
        assert_eq!(merged[0].last_updated, later);
        assert_eq!(merged[0].scan_session.as_deref(), Some("scan_2"));
    }

    #[test]
    fn inventory_merge_never_duplicates_names() {
        let now = Utc::now();
        let batch = [
            priced("A", Some(1)),
            priced("B", Some(2)),
            priced("A", Some(3)),
        ];
        let mut entries = merge_into_inventory(&[], &batch, "scan_1", now);
        entries = merge_into_inventory(&entries, &batch, "scan_2", now);

        for name in ["A", "B"] {
            assert_eq!(entries.iter().filter(|e| e.item.name == name).count(), 1);
        }
        let a = entries.iter().find(|e| e.item.name == "A").unwrap();
        assert_eq!(a.item.price, Some(3));
    }

    // ── merge_price_refresh ─────────────────────────────────────────────

    #[test]
    fn price_refresh_only_touches_existing_entries() {
        let first = Utc::now() - Duration::hours(1);
        let now = Utc::now();
        let mut relic = priced("Lith A1 Relic", Some(2));
        relic.category = ItemCategory::Relic;
        let entries = merge_into_inventory(&[], &[relic], "scan_1", first);

        let mut fresh = priced("Lith A1 Relic", Some(9));
        fresh.category = ItemCategory::PrimePart;
        let (merged, updated) =
            merge_price_refresh(&entries, &[fresh, priced("Unknown", Some(1))], now);

        assert_eq!(updated, 1);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].item.price, Some(9));
        // Identity fields are not refreshed
        assert_eq!(merged[0].item.category, ItemCategory::Relic);
        assert_eq!(merged[0].added_at, first);
        assert_eq!(merged[0].last_updated, now);
        assert_eq!(merged[0].scan_session.as_deref(), Some("scan_1"));
    }
}
