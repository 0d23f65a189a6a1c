//! Row planner and sync operations for the order mirror.
//!
//! A sync reads the whole table once, plans against the in-memory copy and
//! then issues at most one append call and one batch-update call. The
//! upstream quota is about 60 calls per minute, so per-row writes are off
//! the table.

use std::collections::HashMap;

use serde_json::Value;
use tracing::instrument;

use smartstore_core::{OrderRecord, dedup_first_seen, sort_newest_first};

use super::SheetsError;
use super::client::SheetsClient;

/// Header row, columns A through H.
pub(crate) const HEADERS: [&str; 8] = [
    "order_date",
    "product_order_id",
    "order_id",
    "product_name",
    "product_option",
    "quantity",
    "buyer_name",
    "status",
];

const ID_COLUMN: usize = 1;
const STATUS_COLUMN: usize = 7;

/// Counts reported after a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
}

/// One planned rewrite of a status cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusUpdate {
    /// 1-based sheet row
    pub row: usize,
    pub status: String,
}

#[derive(Debug, Default)]
pub(crate) struct SyncPlan {
    /// Rows to append, header first when the sheet is empty
    pub appends: Vec<Vec<String>>,
    pub updates: Vec<StatusUpdate>,
    /// Records appended, header row not counted
    pub added: usize,
}

// =============================================================================
// Planner
// =============================================================================

/// Plan the writes that reconcile the sheet with `incoming`.
///
/// Row 1 is the header; data row `i` of the read-back therefore lives at
/// sheet row `i + 1`. Existing rows are never removed, new ids are
/// appended and ids whose status changed get their status cell rewritten.
/// When a hand-edited sheet carries the same id twice, the last row is the
/// one compared and updated.
pub(crate) fn plan_sync(existing_rows: &[Vec<Value>], incoming: Vec<OrderRecord>) -> SyncPlan {
    let incoming = dedup_first_seen(incoming);

    let mut by_id: HashMap<String, (usize, String)> = HashMap::new();
    for (index, row) in existing_rows.iter().enumerate().skip(1) {
        let id = cell_text(row.get(ID_COLUMN));
        if id.is_empty() {
            continue;
        }
        by_id.insert(id, (index + 1, cell_text(row.get(STATUS_COLUMN))));
    }

    let mut plan = SyncPlan::default();
    if existing_rows.is_empty() {
        plan.appends
            .push(HEADERS.iter().map(ToString::to_string).collect());
    }

    for record in incoming {
        match by_id.get(&record.product_order_id) {
            Some((row, status)) => {
                if *status != record.status {
                    plan.updates.push(StatusUpdate {
                        row: *row,
                        status: record.status,
                    });
                }
            }
            None => {
                plan.appends.push(record_to_row(&record));
                plan.added += 1;
            }
        }
    }
    plan
}

// =============================================================================
// Row mapping
// =============================================================================

pub(crate) fn record_to_row(record: &OrderRecord) -> Vec<String> {
    vec![
        record.order_date.clone(),
        record.product_order_id.clone(),
        record.order_id.clone(),
        record.product_name.clone(),
        record.product_option.clone(),
        record.quantity.to_string(),
        record.buyer_name.clone(),
        record.status.clone(),
    ]
}

/// Map a read-back row to a record. Rows without an id are skipped; they
/// cannot participate in a merge.
pub(crate) fn row_to_record(row: &[Value]) -> Option<OrderRecord> {
    let product_order_id = cell_text(row.get(ID_COLUMN));
    if product_order_id.is_empty() {
        return None;
    }

    Some(OrderRecord {
        product_order_id,
        order_id: cell_text(row.get(2)),
        order_date: cell_text(row.first()),
        product_name: cell_text(row.get(3)),
        product_option: cell_text(row.get(4)),
        quantity: cell_text(row.get(5)).parse().unwrap_or(0),
        buyer_name: cell_text(row.get(6)),
        status: cell_text(row.get(STATUS_COLUMN)),
    })
}

/// Cells come back as strings normally, but untyped sheets can hold raw
/// numbers.
fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

// =============================================================================
// Operations
// =============================================================================

impl SheetsClient {
    /// Upsert `incoming` into the sheet.
    ///
    /// One read, then at most one append and one batch update.
    ///
    /// # Errors
    ///
    /// Any API failure aborts the sync; the sheet self-heals on the next
    /// run since the plan is recomputed from a fresh read.
    #[instrument(skip(self, incoming), fields(incoming = incoming.len()))]
    pub async fn sync_orders(&self, incoming: &[OrderRecord]) -> Result<SyncSummary, SheetsError> {
        let existing = self.read_rows().await?;
        let plan = plan_sync(&existing, incoming.to_vec());
        let summary = SyncSummary {
            added: plan.added,
            updated: plan.updates.len(),
        };

        if !plan.appends.is_empty() {
            self.append_rows(&plan.appends).await?;
        }
        if !plan.updates.is_empty() {
            self.update_statuses(&plan.updates).await?;
        }

        tracing::info!(
            added = summary.added,
            updated = summary.updated,
            "sheet sync finished"
        );
        Ok(summary)
    }

    /// Clear the sheet and rewrite it from `records`, header included.
    ///
    /// # Errors
    ///
    /// A failure between the clear and the append leaves the sheet empty
    /// until the next sync rebuilds it.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn replace_all(&self, records: &[OrderRecord]) -> Result<usize, SheetsError> {
        self.clear_rows().await?;

        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(HEADERS.iter().map(ToString::to_string).collect());
        rows.extend(records.iter().map(record_to_row));
        self.append_rows(&rows).await?;

        tracing::info!(rows = records.len(), "sheet rebuilt");
        Ok(records.len())
    }

    /// Read the mirrored orders back, newest first.
    ///
    /// # Errors
    ///
    /// Fails when the sheet cannot be read; rows without an id are
    /// silently skipped.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self) -> Result<Vec<OrderRecord>, SheetsError> {
        let rows = self.read_rows().await?;
        let mut records: Vec<OrderRecord> = rows
            .iter()
            .skip(1)
            .filter_map(|row| row_to_record(row))
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }
}
