//! Grouping input records into one output row per item.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::config::ItemOrder;
use crate::input::InputRecord;
use crate::size_key::{normalize, SizeKey};

/// Summed quantities of one item, keyed by normalized size.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub item_id: String,
    pub sizes: BTreeMap<SizeKey, f64>,
}

impl AggregatedRow {
    pub fn total_quantity(&self) -> f64 {
        self.sizes.values().sum()
    }
}

/// Sum quantities per `(item, size key)`.
///
/// Records whose size normalizes to the empty key still create the item's
/// row but contribute no quantity. Rows come out sorted by item id or in
/// first-seen order.
pub fn aggregate(records: &[InputRecord], order: ItemOrder) -> Vec<AggregatedRow> {
    let mut items: IndexMap<&str, BTreeMap<SizeKey, f64>> = IndexMap::new();
    let mut sizeless = 0usize;

    for record in records {
        let sizes = items.entry(record.item_id.as_str()).or_default();
        let key = normalize(&record.raw_size);
        if key.is_empty() {
            sizeless += 1;
            continue;
        }
        *sizes.entry(key).or_insert(0.0) += record.quantity;
    }

    if sizeless > 0 {
        tracing::debug!("{} input rows had no size", sizeless);
    }
    if order == ItemOrder::Sorted {
        items.sort_unstable_keys();
    }

    items
        .into_iter()
        .map(|(item_id, sizes)| AggregatedRow {
            item_id: item_id.to_string(),
            sizes,
        })
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::size_key::{normalize_str, RawSize};

    fn records() -> Vec<InputRecord> {
        vec![
            InputRecord::new("SKU2", "M", 1.0),
            InputRecord::new("SKU1", "7,5", 2.0),
            InputRecord::new("SKU1", 7.5, 3.0),
            InputRecord::new("SKU1", "8", 0.0),
            InputRecord::new("SKU3", RawSize::Missing, 4.0),
        ]
    }

    #[test]
    fn test_sums_equivalent_sizes() {
        let rows = aggregate(&records(), ItemOrder::Sorted);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].item_id, "SKU1");
        assert_eq!(rows[0].sizes[&normalize_str("7.5")], 5.0);
        assert_eq!(rows[0].sizes[&normalize_str("8")], 0.0);
        assert_eq!(rows[0].total_quantity(), 5.0);
    }

    #[test]
    fn test_sizeless_item_keeps_row() {
        let rows = aggregate(&records(), ItemOrder::Sorted);
        assert_eq!(rows[2].item_id, "SKU3");
        assert!(rows[2].sizes.is_empty());
    }

    #[test]
    fn test_file_order() {
        let rows = aggregate(&records(), ItemOrder::File);
        let ids: Vec<_> = rows.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["SKU2", "SKU1", "SKU3"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], ItemOrder::Sorted).is_empty());
    }
}
