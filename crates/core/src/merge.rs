//! Order reconciliation.
//!
//! Combines a batch of freshly fetched orders with an existing record set.
//! All functions here are pure; the dashboard's cache controller decides when
//! to call them and with which mode.

use std::collections::{HashMap, HashSet};

use crate::types::order::{OrderRecord, sort_newest_first};

/// How an incoming batch combines with the existing record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Discard the existing set; the deduplicated batch becomes the result.
    Replace,
    /// Overwrite matching records in place and append the rest. Existing
    /// records never disappear.
    #[default]
    Upsert,
}

/// Drop duplicate ids from a batch, keeping the first occurrence of each
/// `product_order_id`. Records with an empty id are dropped outright.
#[must_use]
pub fn dedup_first_seen(records: Vec<OrderRecord>) -> Vec<OrderRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| {
            !record.product_order_id.is_empty() && seen.insert(record.product_order_id.clone())
        })
        .collect()
}

/// Merge `incoming` into `existing` and return the combined set sorted
/// newest-first.
///
/// Within `incoming` the first record per `product_order_id` wins. Across
/// the two sets `incoming` wins: under [`MergeMode::Upsert`] an incoming
/// record replaces the existing record with the same id, and unseen ids are
/// appended. [`MergeMode::Replace`] ignores `existing` entirely.
#[must_use]
pub fn merge(
    existing: Vec<OrderRecord>,
    incoming: Vec<OrderRecord>,
    mode: MergeMode,
) -> Vec<OrderRecord> {
    let incoming = dedup_first_seen(incoming);

    let mut merged = match mode {
        MergeMode::Replace => incoming,
        MergeMode::Upsert => {
            let mut merged = existing;
            merged.retain(|record| !record.product_order_id.is_empty());

            let mut index: HashMap<String, usize> = merged
                .iter()
                .enumerate()
                .map(|(slot, record)| (record.product_order_id.clone(), slot))
                .collect();

            for record in incoming {
                if let Some(&slot) = index.get(&record.product_order_id) {
                    if let Some(current) = merged.get_mut(slot) {
                        *current = record;
                    }
                } else {
                    index.insert(record.product_order_id.clone(), merged.len());
                    merged.push(record);
                }
            }
            merged
        }
    };

    sort_newest_first(&mut merged);
    merged
}
