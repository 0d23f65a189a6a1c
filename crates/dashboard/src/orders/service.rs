//! Order service: refresh policy, merging and sheet mirroring.
//!
//! The service owns the cache and serializes refreshes behind a gate so
//! concurrent requests cannot fan out into duplicate upstream scans. The
//! sheet mirror is strictly best-effort; it never fails a request.

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use smartstore_core::{MergeMode, OrderRecord};

use super::cache::OrderCache;
use crate::commerce::{CommerceClient, CommerceError, filter_finalized, normalize_orders};
use crate::config::OrderCacheConfig;
use crate::sheets::{SheetsClient, SyncSummary};

/// Days fetched by an implicit refresh and by a sync that names no range.
pub const DEFAULT_FETCH_DAYS: u32 = 3;

/// Hard cap on how far back an explicit sync may reach.
const MAX_SYNC_DAYS: u32 = 90;

/// Where a served snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    Cache,
    Refreshed,
}

impl OrderSource {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Refreshed => "api",
        }
    }
}

/// Refresh failure carrying the last good snapshot, so callers can keep
/// rendering data instead of an empty page.
#[derive(Debug, Error)]
#[error("order refresh failed: {error}")]
pub struct RefreshError {
    #[source]
    pub error: CommerceError,
    pub stale: Vec<OrderRecord>,
}

/// Result of an explicit sync.
#[derive(Debug)]
pub struct SyncOutcome {
    pub orders: Vec<OrderRecord>,
    pub message: String,
}

enum MirrorOutcome {
    Disabled,
    Synced(SyncSummary),
    Failed,
}

pub struct OrderService {
    commerce: CommerceClient,
    sheets: Option<SheetsClient>,
    cache: OrderCache,
    include_finalized: bool,
    /// Serializes refreshes; freshness is re-checked after acquisition.
    refresh_gate: Mutex<()>,
}

impl OrderService {
    #[must_use]
    pub fn new(
        commerce: CommerceClient,
        sheets: Option<SheetsClient>,
        config: &OrderCacheConfig,
    ) -> Self {
        Self {
            commerce,
            sheets,
            cache: OrderCache::new(config.staleness_window),
            include_finalized: config.include_finalized,
            refresh_gate: Mutex::new(()),
        }
    }

    /// Serve the order snapshot, refreshing it first when it is stale,
    /// empty or explicitly forced. Always returns the full accumulated
    /// set, never a partial page.
    ///
    /// # Errors
    ///
    /// A failed refresh returns the prior snapshot inside the error, so
    /// availability wins over freshness.
    #[instrument(skip(self))]
    pub async fn get_orders(
        &self,
        force_refresh: bool,
    ) -> Result<(Vec<OrderRecord>, OrderSource), RefreshError> {
        if !self.cache.refresh_due(force_refresh).await {
            return Ok((self.cache.records().await, OrderSource::Cache));
        }

        let _refresh = self.refresh_gate.lock().await;
        // Whoever held the gate may have refreshed in the meantime.
        if !self.cache.refresh_due(force_refresh).await {
            return Ok((self.cache.records().await, OrderSource::Cache));
        }

        self.seed_from_sheet().await;

        match self.fetch_window(0, DEFAULT_FETCH_DAYS).await {
            Ok(fetched) => {
                let merged = self.cache.apply(fetched, MergeMode::Upsert).await;
                Ok((merged, OrderSource::Refreshed))
            }
            Err(error) => {
                tracing::error!(%error, "order refresh failed, serving stale snapshot");
                Err(RefreshError {
                    error,
                    stale: self.cache.records().await,
                })
            }
        }
    }

    /// Explicit sync over `days` one-day windows ending `offset` days back.
    ///
    /// Fetches regardless of snapshot age. `replace` rebuilds the snapshot
    /// and the sheet from scratch; otherwise the fetch is upserted into
    /// both. Returns the merged set plus a human-readable summary.
    ///
    /// # Errors
    ///
    /// Fails only when the upstream fetch fails; the error carries the
    /// prior snapshot. A sheet mirror failure is reported in the message
    /// instead.
    #[instrument(skip(self))]
    pub async fn sync(
        &self,
        days: u32,
        offset: u32,
        replace: bool,
    ) -> Result<SyncOutcome, RefreshError> {
        let (days, offset) = clamp_range(days, offset);
        let _refresh = self.refresh_gate.lock().await;

        if !replace {
            self.seed_from_sheet().await;
        }

        let fetched = match self.fetch_window(offset, days).await {
            Ok(fetched) => fetched,
            Err(error) => {
                tracing::error!(%error, "order sync failed");
                return Err(RefreshError {
                    error,
                    stale: self.cache.records().await,
                });
            }
        };
        let fetched_count = fetched.len();

        let mode = if replace {
            MergeMode::Replace
        } else {
            MergeMode::Upsert
        };
        let merged = self.cache.apply(fetched.clone(), mode).await;

        let mirror = self.mirror(&fetched, &merged, replace).await;
        let message = sync_message(days, offset, fetched_count, &mirror);
        Ok(SyncOutcome {
            orders: merged,
            message,
        })
    }

    /// Fetch one window and normalize it to records.
    async fn fetch_window(&self, offset: u32, days: u32) -> Result<Vec<OrderRecord>, CommerceError> {
        let raw = self.commerce.fetch_changed_orders(offset, days).await?;
        let records = normalize_orders(raw);
        Ok(filter_finalized(records, self.include_finalized))
    }

    /// Seed an empty snapshot from the sheet so history survives restarts.
    /// Failures are logged and skipped.
    async fn seed_from_sheet(&self) {
        let Some(sheets) = &self.sheets else { return };
        if !self.cache.is_empty().await {
            return;
        }

        match sheets.fetch_orders().await {
            Ok(records) if !records.is_empty() => {
                let count = records.len();
                self.cache.apply(records, MergeMode::Upsert).await;
                tracing::info!(records = count, "seeded order cache from sheet");
            }
            Ok(_) => {}
            Err(error) => tracing::warn!(%error, "sheet seed failed, starting empty"),
        }
    }

    /// Mirror the sync result to the sheet, best-effort.
    async fn mirror(
        &self,
        fetched: &[OrderRecord],
        merged: &[OrderRecord],
        replace: bool,
    ) -> MirrorOutcome {
        let Some(sheets) = &self.sheets else {
            return MirrorOutcome::Disabled;
        };

        let result = if replace {
            sheets.replace_all(merged).await.map(|added| SyncSummary {
                added,
                updated: 0,
            })
        } else {
            sheets.sync_orders(fetched).await
        };

        match result {
            Ok(summary) => MirrorOutcome::Synced(summary),
            Err(error) => {
                tracing::warn!(%error, "sheet mirror failed");
                MirrorOutcome::Failed
            }
        }
    }
}

fn clamp_range(days: u32, offset: u32) -> (u32, u32) {
    (days.clamp(1, MAX_SYNC_DAYS), offset.min(MAX_SYNC_DAYS))
}

fn sync_message(days: u32, offset: u32, fetched: usize, mirror: &MirrorOutcome) -> String {
    let base = if offset == 0 {
        format!("Synced {fetched} orders from the last {days} days")
    } else {
        format!("Synced {fetched} orders from {days} days starting {offset} days back")
    };
    match mirror {
        MirrorOutcome::Disabled => base,
        MirrorOutcome::Synced(summary) => format!(
            "{base}; sheet: {} added, {} updated",
            summary.added, summary.updated
        ),
        MirrorOutcome::Failed => format!("{base}; sheet mirror failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::CommerceConfig;

    fn service() -> OrderService {
        let commerce = CommerceClient::new(&CommerceConfig {
            client_id: "client-id".to_string(),
            client_secret: SecretString::from("$2a$04$N9qo8uLOickgx2ZMRZoMye"),
        })
        .unwrap();
        OrderService::new(
            commerce,
            None,
            &OrderCacheConfig {
                staleness_window: std::time::Duration::from_secs(300),
                include_finalized: false,
            },
        )
    }

    fn record(id: &str, date: &str) -> OrderRecord {
        OrderRecord {
            product_order_id: id.to_string(),
            order_id: "ORD".to_string(),
            order_date: date.to_string(),
            product_name: "Hand Cream".to_string(),
            product_option: String::new(),
            quantity: 1,
            buyer_name: "Kim Minji".to_string(),
            status: "PAYED".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_served_without_upstream_calls() {
        let service = service();
        service
            .cache
            .apply(vec![record("A", "2026-01-02")], MergeMode::Upsert)
            .await;

        // No credentials would work here, so reaching upstream would fail.
        let (records, source) = service.get_orders(false).await.unwrap();
        assert_eq!(source, OrderSource::Cache);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_order_id, "A");
    }

    #[test]
    fn test_clamp_range_bounds() {
        assert_eq!(clamp_range(0, 0), (1, 0));
        assert_eq!(clamp_range(3, 2), (3, 2));
        assert_eq!(clamp_range(400, 400), (90, 90));
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(OrderSource::Cache.label(), "cache");
        assert_eq!(OrderSource::Refreshed.label(), "api");
    }

    #[test]
    fn test_sync_messages() {
        assert_eq!(
            sync_message(3, 0, 12, &MirrorOutcome::Disabled),
            "Synced 12 orders from the last 3 days"
        );
        assert_eq!(
            sync_message(7, 3, 2, &MirrorOutcome::Disabled),
            "Synced 2 orders from 7 days starting 3 days back"
        );
        assert_eq!(
            sync_message(
                3,
                0,
                12,
                &MirrorOutcome::Synced(SyncSummary {
                    added: 4,
                    updated: 2
                })
            ),
            "Synced 12 orders from the last 3 days; sheet: 4 added, 2 updated"
        );
        assert_eq!(
            sync_message(3, 0, 12, &MirrorOutcome::Failed),
            "Synced 12 orders from the last 3 days; sheet mirror failed"
        );
    }

    #[test]
    fn test_refresh_error_reports_cause_and_keeps_snapshot() {
        let error = RefreshError {
            error: CommerceError::AuthenticationFailed("rejected".to_string()),
            stale: vec![record("A", "2026-01-02")],
        };
        assert_eq!(
            error.to_string(),
            "order refresh failed: Authentication failed: rejected"
        );
        assert_eq!(error.stale.len(), 1);
    }
}
