//! Domain types for the SmartStore dashboard.

pub mod order;
pub mod product;

pub use order::{
    FINALIZED_STATUS, MISSING_FIELD, OrderRecord, compare_order_dates, sort_newest_first,
};
pub use product::{ProductOption, ProductSummary};
