//! In-memory order snapshot.

use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use smartstore_core::{MergeMode, OrderRecord, merge};

/// Process-wide order snapshot with an age-based freshness rule.
///
/// All mutation goes through [`apply`](Self::apply), which merges under a
/// write lock, so readers never observe a half-written set.
pub struct OrderCache {
    snapshot: RwLock<Snapshot>,
    staleness_window: Duration,
}

#[derive(Default)]
struct Snapshot {
    records: Vec<OrderRecord>,
    last_updated: Option<Instant>,
}

impl OrderCache {
    #[must_use]
    pub fn new(staleness_window: Duration) -> Self {
        Self {
            snapshot: RwLock::new(Snapshot::default()),
            staleness_window,
        }
    }

    /// Copy of the current records, newest first.
    pub async fn records(&self) -> Vec<OrderRecord> {
        self.snapshot.read().await.records.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot.read().await.records.is_empty()
    }

    /// Whether a request should refresh instead of serving the snapshot:
    /// when forced, when the cache holds nothing yet, or when the snapshot
    /// outlived the staleness window.
    pub async fn refresh_due(&self, force: bool) -> bool {
        if force {
            return true;
        }
        let snapshot = self.snapshot.read().await;
        match snapshot.last_updated {
            Some(at) if !snapshot.records.is_empty() => {
                at.elapsed() > self.staleness_window
            }
            _ => true,
        }
    }

    /// Merge `incoming` into the snapshot and return the merged set.
    pub async fn apply(&self, incoming: Vec<OrderRecord>, mode: MergeMode) -> Vec<OrderRecord> {
        let mut snapshot = self.snapshot.write().await;
        let merged = merge(std::mem::take(&mut snapshot.records), incoming, mode);
        snapshot.records = merged.clone();
        snapshot.last_updated = Some(Instant::now());
        merged
    }
}
