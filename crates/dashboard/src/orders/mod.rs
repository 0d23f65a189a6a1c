//! Order snapshot cache and refresh policy.

pub mod cache;
pub mod service;

pub use cache::OrderCache;
pub use service::{DEFAULT_FETCH_DAYS, OrderService, OrderSource, RefreshError, SyncOutcome};
