//! Table sorting for result and inventory listings

use crate::types::DetectedItem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Price,
    Ducats,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Stable sort; missing prices and ducats count as 0.
pub fn sort_items<T: AsRef<DetectedItem>>(
    items: &mut [T],
    field: SortField,
    direction: SortDirection,
) {
    items.sort_by(|a, b| {
        let (a, b) = (a.as_ref(), b.as_ref());
        let ordering = match field {
            SortField::Price => a.platinum().cmp(&b.platinum()),
            SortField::Ducats => a.ducat_value().cmp(&b.ducat_value()),
            SortField::Name => a.name.cmp(&b.name),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemCategory;

    fn item(name: &str, price: Option<u32>, ducats: Option<u32>) -> DetectedItem {
        let mut item = DetectedItem::new(name, ItemCategory::PrimePart);
        item.price = price;
        item.ducats = ducats;
        item
    }

    fn names(items: &[DetectedItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn sorts_by_price_descending_by_default() {
        let mut items = vec![
            item("B", Some(5), None),
            item("A", None, None),
            item("C", Some(40), None),
        ];
        sort_items(&mut items, SortField::default(), SortDirection::default());
        assert_eq!(names(&items), ["C", "B", "A"]);
    }

    #[test]
    fn sorts_by_ducats_ascending() {
        let mut items = vec![
            item("B", None, Some(100)),
            item("A", None, Some(15)),
            item("C", None, None),
        ];
        sort_items(&mut items, SortField::Ducats, SortDirection::Ascending);
        assert_eq!(names(&items), ["C", "A", "B"]);
    }

    #[test]
    fn sorts_by_name() {
        let mut items = vec![
            item("Nikana Prime Hilt", None, None),
            item("Ash Prime Systems", None, None),
        ];
        sort_items(&mut items, SortField::Name, SortDirection::Ascending);
        assert_eq!(names(&items), ["Ash Prime Systems", "Nikana Prime Hilt"]);

        sort_items(&mut items, SortField::Name, SortDirection::Descending);
        assert_eq!(names(&items), ["Nikana Prime Hilt", "Ash Prime Systems"]);
    }
}
