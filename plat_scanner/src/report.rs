//! Plain-text tables for the CLI

use crate::inventory::{InventoryEntry, InventoryStats};
use crate::queue::{JobStatus, QueueSnapshot};
use plat_common::{DetectedItem, ItemCategory, ItemStatus};

fn value_or_dash(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn display_name(item: &DetectedItem) -> String {
    match item.rarity {
        Some(rarity) => format!("{} [{}]", item.name, rarity),
        None => item.name.clone(),
    }
}

fn note(item: &DetectedItem) -> String {
    match (item.status, item.error.as_deref()) {
        (ItemStatus::Error, Some(msg)) => format!("ERROR: {msg}"),
        (ItemStatus::Error, None) => "ERROR".to_string(),
        (ItemStatus::Loading, _) => "pending".to_string(),
        (ItemStatus::Loaded, Some(msg)) => msg.to_string(),
        (ItemStatus::Loaded, None) => String::new(),
    }
}

fn push_row(output: &mut String, width: usize, item: &DetectedItem) {
    output.push_str(&format!(
        "{:<width$}  {:>6}  {:>6}  {:>6}  {:>6}  {}\n",
        display_name(item),
        value_or_dash(item.price),
        value_or_dash(item.average),
        value_or_dash(item.ducats),
        value_or_dash(item.volume),
        note(item),
    ));
}

fn header(width: usize) -> String {
    format!(
        "{:<width$}  {:>6}  {:>6}  {:>6}  {:>6}\n",
        "Item", "Plat", "Avg", "Ducats", "Orders"
    )
}

fn column_width<'a>(items: impl Iterator<Item = &'a DetectedItem>) -> usize {
    items
        .map(|i| display_name(i).chars().count())
        .max()
        .unwrap_or(0)
        .max(4)
}

/// Table of detected items with a platinum/ducat total line
pub fn format_results(items: &[DetectedItem]) -> String {
    if items.is_empty() {
        return "No new items found.\n".to_string();
    }

    let width = column_width(items.iter());
    let mut output = header(width);
    for item in items {
        push_row(&mut output, width, item);
    }

    let plat: u64 = items.iter().map(DetectedItem::platinum).sum();
    let ducats: u64 = items.iter().map(DetectedItem::ducat_value).sum();
    output.push_str(&format!(
        "\n{} item(s), {} platinum, {} ducats\n",
        items.len(),
        plat,
        ducats
    ));
    output
}

/// One line per job with its status
pub fn format_jobs(snapshot: &QueueSnapshot) -> String {
    let mut output = String::new();
    for job in &snapshot.jobs {
        let status = match job.status {
            JobStatus::Queued => "queued",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Fetching => "fetching",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        };
        output.push_str(&format!(
            "{:<10} {} ({} item(s))",
            status,
            job.name,
            job.results.len()
        ));
        if let Some(error) = &job.error {
            output.push_str(&format!(" - {error}"));
        }
        output.push('\n');
    }
    output.push_str(&format!(
        "{}/{} screenshot(s) processed\n",
        snapshot.processed, snapshot.total
    ));
    output
}

/// Inventory grouped by category, entries in the order given
pub fn format_inventory(entries: &[InventoryEntry], stats: &InventoryStats) -> String {
    if entries.is_empty() {
        return "Inventory is empty.\n".to_string();
    }

    let width = column_width(entries.iter().map(|e| &e.item));
    let mut output = String::new();

    for category in ItemCategory::ALL {
        let in_category: Vec<&InventoryEntry> =
            entries.iter().filter(|e| e.category() == category).collect();
        if in_category.is_empty() {
            continue;
        }

        let totals = stats.by_category.iter().find(|s| s.category == category);
        output.push_str(&format!("== {} ", category.display_name()));
        if let Some(totals) = totals {
            output.push_str(&format!(
                "({} items, {} platinum, {} ducats)",
                totals.total_items, totals.total_value, totals.total_ducats
            ));
        }
        output.push_str(" ==\n");

        output.push_str(&header(width));
        for entry in in_category {
            push_row(&mut output, width, &entry.item);
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Total: {} items, {} platinum, {} ducats (last scan {})\n",
        stats.total_items,
        stats.total_value,
        stats.total_ducats,
        stats.last_scan_date.format("%Y-%m-%d %H:%M UTC")
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryStore;
    use plat_common::{MarketQuote, RelicRarity};

    fn priced(name: &str, category: ItemCategory, price: u32) -> DetectedItem {
        let mut item = DetectedItem::new(name, category);
        item.apply_quote(&MarketQuote {
            price,
            ducats: 45,
            volume: 7,
            average: price,
            thumbnail: None,
        });
        item
    }

    #[test]
    fn results_table_lists_items_and_totals() {
        let mut failed = DetectedItem::new("Kronen Prime Blade", ItemCategory::PrimePart);
        failed.mark_failed("market lookup failed: 503");
        let items = vec![
            priced("Mirage Prime Blueprint", ItemCategory::PrimePart, 35),
            priced("Lith A1 Relic", ItemCategory::Relic, 0)
                .with_rarity(Some(RelicRarity::Radiant)),
            failed,
        ];

        let table = format_results(&items);

        assert!(table.starts_with("Item"));
        assert!(table.contains("Lith A1 Relic [radiant]"));
        assert!(table.contains("No active buy orders"));
        assert!(table.contains("ERROR: market lookup failed: 503"));
        assert!(table.contains("3 item(s), 35 platinum, 90 ducats"));
    }

    #[test]
    fn empty_results() {
        assert_eq!(format_results(&[]), "No new items found.\n");
    }

    #[test]
    fn inventory_is_grouped_by_category() {
        let mut store = InventoryStore::in_memory();
        store.upsert(
            &[
                priced("Lith A1 Relic", ItemCategory::Relic, 4),
                priced("Mirage Prime Blueprint", ItemCategory::PrimePart, 35),
            ],
            Some("scan_1"),
        );

        let text = format_inventory(store.entries(), &store.stats());

        let primes = text.find("== Prime Parts").unwrap();
        let relics = text.find("== Void Relics").unwrap();
        assert!(primes < relics);
        assert!(text.contains("(1 items, 35 platinum, 45 ducats)"));
        assert!(text.contains("Total: 2 items, 39 platinum, 90 ducats"));
    }
}
