//! Product catalog shapes returned by the inventory endpoint.

use serde::{Deserialize, Serialize};

/// One sellable option row under a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option label; multi-axis options are joined with `" / "`.
    pub name: String,
    /// Remaining stock for this option.
    pub stock: i64,
}

/// A product currently on sale, with per-option stock when it has options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Display name, `"N/A"` when absent.
    pub name: String,
    /// Sale status as reported upstream.
    pub status: String,
    /// Sale price in KRW.
    pub price: i64,
    /// Product-level stock quantity.
    pub total_stock: i64,
    /// Origin product number, used for option detail lookups.
    pub origin_product_no: Option<i64>,
    /// Per-option stock rows, empty for optionless products.
    pub options: Vec<ProductOption>,
}
