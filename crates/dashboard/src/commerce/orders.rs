//! Order scanning over the change-status endpoints.
//!
//! Recent activity is found by scanning one-day windows of the
//! last-changed-statuses endpoint and resolving the collected order ids in
//! bulk afterwards. A failed window or batch degrades to a partial result
//! instead of failing the whole scan; only a failed token exchange aborts.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::instrument;

use super::CommerceError;
use super::client::CommerceClient;

const LAST_CHANGED_ENDPOINT: &str = "/v1/pay-order/seller/product-orders/last-changed-statuses";
const ORDER_QUERY_ENDPOINT: &str = "/v1/pay-order/seller/product-orders/query";

/// Windows scanned at once.
const MAX_CONCURRENT_WINDOWS: usize = 10;

/// The bulk query endpoint rejects requests with more ids than this.
const QUERY_BATCH_LIMIT: usize = 300;

/// Overall budget for one scan, shared between the window scan and the
/// detail lookups.
const SCAN_DEADLINE: Duration = Duration::from_secs(25);

/// Timestamp format the pay-order endpoints accept, millisecond precision
/// with a numeric offset.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Seller-local timezone used for day boundaries.
pub(crate) fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("9 hour offset is in range")
}

// =============================================================================
// Scan windows
// =============================================================================

/// One day-sized slice of the scan range.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanWindow {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
}

/// Build `count` one-day windows walking backwards from `now`, skipping the
/// most recent `offset` days. Window `i` covers `[now - (i + 1)d, now - id]`,
/// so consecutive windows share a boundary and the union is gap-free.
pub(crate) fn day_windows(now: DateTime<FixedOffset>, offset: u32, count: u32) -> Vec<ScanWindow> {
    (offset..offset.saturating_add(count))
        .map(|i| ScanWindow {
            from: now - chrono::Duration::days(i64::from(i) + 1),
            to: now - chrono::Duration::days(i64::from(i)),
        })
        .collect()
}

fn format_timestamp(at: DateTime<FixedOffset>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

// =============================================================================
// Wire types
// =============================================================================

/// One entry of the bulk order query response, pairing the product-order
/// part with its enclosing order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOrderItem {
    pub product_order: RawProductOrder,
    pub order: RawOrder,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProductOrder {
    pub product_order_id: String,
    pub product_order_status: Option<String>,
    pub product_name: Option<String>,
    pub product_option: Option<String>,
    pub quantity: Option<i64>,
    pub place_order_date: Option<String>,
    pub shipping_address: Option<RawShippingAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawShippingAddress {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub order_date: Option<String>,
    pub orderer_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LastChangedResponse {
    data: LastChangedData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LastChangedData {
    last_change_statuses: Vec<ChangedStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChangedStatus {
    product_order_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OrderQueryResponse {
    data: Vec<RawOrderItem>,
}

// =============================================================================
// Scan pipeline
// =============================================================================

/// Run `tasks` with bounded concurrency under a deadline, keeping whatever
/// succeeded. Failures are logged and skipped; hitting the deadline returns
/// the results collected so far.
async fn gather_partial<F, T>(label: &'static str, deadline: Duration, tasks: Vec<F>) -> Vec<T>
where
    F: Future<Output = Result<T, CommerceError>>,
{
    let total = tasks.len();
    let results = stream::iter(tasks).buffer_unordered(MAX_CONCURRENT_WINDOWS);
    tokio::pin!(results);

    let timeout = tokio::time::sleep(deadline);
    tokio::pin!(timeout);

    let mut collected = Vec::with_capacity(total);
    loop {
        tokio::select! {
            item = results.next() => match item {
                Some(Ok(value)) => collected.push(value),
                Some(Err(error)) => {
                    tracing::warn!(%error, task = label, "request failed, skipping");
                }
                None => break,
            },
            () = &mut timeout => {
                tracing::warn!(
                    task = label,
                    completed = collected.len(),
                    total,
                    "deadline reached, keeping partial results"
                );
                break;
            }
        }
    }
    collected
}

/// Drop duplicates and empty ids, keeping first-seen order.
fn dedup_ids<I: IntoIterator<Item = String>>(ids: I) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Split ids into bulk-query sized batches.
fn id_batches(ids: &[String]) -> impl Iterator<Item = &[String]> {
    ids.chunks(QUERY_BATCH_LIMIT)
}

impl CommerceClient {
    /// Scan `count` one-day windows ending `offset` days back and return the
    /// raw order items that changed in that range.
    ///
    /// # Errors
    ///
    /// Fails only when no bearer token can be obtained. Window and batch
    /// failures are skipped, so the result may be partial.
    #[instrument(skip(self))]
    pub async fn fetch_changed_orders(
        &self,
        offset: u32,
        count: u32,
    ) -> Result<Vec<RawOrderItem>, CommerceError> {
        // Without a token every window would fail identically.
        self.bearer().await?;

        let started = Instant::now();
        let now = Utc::now().with_timezone(&kst());

        let scans: Vec<_> = day_windows(now, offset, count)
            .into_iter()
            .map(|window| self.changed_order_ids(window))
            .collect();
        let window_ids = gather_partial("change scan", SCAN_DEADLINE, scans).await;

        let ids = dedup_ids(window_ids.into_iter().flatten());
        tracing::debug!(ids = ids.len(), "change scan finished");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let remaining = SCAN_DEADLINE.saturating_sub(started.elapsed());
        let lookups: Vec<_> = id_batches(&ids)
            .map(|chunk| self.resolve_order_batch(chunk))
            .collect();
        let batches = gather_partial("detail lookup", remaining, lookups).await;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Product-order ids that changed status inside `window`.
    async fn changed_order_ids(&self, window: ScanWindow) -> Result<Vec<String>, CommerceError> {
        let query = [
            ("lastChangedFrom", format_timestamp(window.from)),
            ("lastChangedTo", format_timestamp(window.to)),
        ];
        let response: LastChangedResponse = self.get_json(LAST_CHANGED_ENDPOINT, &query).await?;
        Ok(response
            .data
            .last_change_statuses
            .into_iter()
            .map(|status| status.product_order_id)
            .collect())
    }

    /// Resolve up to [`QUERY_BATCH_LIMIT`] order ids into full order items.
    async fn resolve_order_batch(&self, ids: &[String]) -> Result<Vec<RawOrderItem>, CommerceError> {
        let body = serde_json::json!({ "productOrderIds": ids });
        let response: OrderQueryResponse = self.post_json(ORDER_QUERY_ENDPOINT, &body).await?;
        Ok(response.data)
    }
}
