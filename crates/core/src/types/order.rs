//! The flat order record shared by the cache, the JSON API, and the sheet
//! mirror.

use core::cmp::Ordering;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Status Naver assigns once the buyer confirms the purchase.
///
/// Orders in this state are settled; the dashboard excludes them unless
/// configured otherwise.
pub const FINALIZED_STATUS: &str = "PURCHASE_DECIDED";

/// Placeholder written into descriptive fields the upstream payload omitted.
pub const MISSING_FIELD: &str = "N/A";

/// A single product order, flattened from the Naver pay-order payload.
///
/// `product_order_id` is the identity: the merge engine and the sheet mirror
/// both key on it and it is never empty. Every other field is display data
/// and may carry a fallback value when the upstream payload omitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Unique id of the product-order line.
    pub product_order_id: String,
    /// Id of the enclosing order, `"N/A"` when absent.
    pub order_id: String,
    /// When the order was placed, RFC 3339 with offset when known, `"N/A"`
    /// when absent.
    pub order_date: String,
    /// Product name, `"N/A"` when absent.
    pub product_name: String,
    /// Selected option text, empty for optionless products.
    pub product_option: String,
    /// Ordered quantity, 0 when absent.
    pub quantity: i64,
    /// Recipient name, falling back to the orderer, then `"N/A"`.
    pub buyer_name: String,
    /// Upstream status code (e.g. `PAYED`, `DELIVERED`), `"N/A"` when absent.
    pub status: String,
}

impl OrderRecord {
    /// Whether the buyer has finalized the purchase.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status == FINALIZED_STATUS
    }
}

/// Compare two order timestamps chronologically.
///
/// Both sides are parsed as RFC 3339 and compared as instants, so payloads
/// with mixed UTC offsets still order correctly. When either side does not
/// parse (the `"N/A"` placeholder, truncated dates), the comparison falls
/// back to lexicographic order so sorting stays total.
#[must_use]
pub fn compare_order_dates(a: &str, b: &str) -> Ordering {
    match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Sort records newest-first by order date.
///
/// The sort is stable, so records with equal timestamps keep their relative
/// order.
pub fn sort_newest_first(records: &mut [OrderRecord]) {
    records.sort_by(|a, b| compare_order_dates(&b.order_date, &a.order_date));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: &str, date: &str) -> OrderRecord {
        OrderRecord {
            product_order_id: id.to_owned(),
            order_id: "ORD-1".to_owned(),
            order_date: date.to_owned(),
            product_name: "Candle".to_owned(),
            product_option: String::new(),
            quantity: 1,
            buyer_name: "Kim".to_owned(),
            status: "PAYED".to_owned(),
        }
    }

    #[test]
    fn test_compare_parses_mixed_offsets() {
        // 00:30 KST is 15:30 UTC the previous day, so the second timestamp
        // is chronologically later despite sorting earlier as a string.
        let kst = "2024-01-02T00:30:00+09:00";
        let utc = "2024-01-01T16:00:00+00:00";
        assert_eq!(compare_order_dates(kst, utc), Ordering::Less);
        assert!(kst > utc);
    }

    #[test]
    fn test_compare_falls_back_to_lexicographic() {
        assert_eq!(
            compare_order_dates(MISSING_FIELD, "2024-01-01T00:00:00+09:00"),
            Ordering::Greater
        );
        assert_eq!(compare_order_dates(MISSING_FIELD, MISSING_FIELD), Ordering::Equal);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut records = vec![
            record("A", "2024-01-01T10:00:00+09:00"),
            record("B", "2024-01-03T10:00:00+09:00"),
            record("C", "2024-01-02T10:00:00+09:00"),
        ];
        sort_newest_first(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.product_order_id.as_str()).collect();
        assert_eq!(ids, ["B", "C", "A"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_dates() {
        let mut records = vec![
            record("A", "2024-01-01T10:00:00+09:00"),
            record("B", "2024-01-01T10:00:00+09:00"),
        ];
        sort_newest_first(&mut records);
        assert_eq!(records[0].product_order_id, "A");
        assert_eq!(records[1].product_order_id, "B");
    }

    #[test]
    fn test_is_finalized() {
        let mut r = record("A", "2024-01-01T10:00:00+09:00");
        assert!(!r.is_finalized());
        r.status = FINALIZED_STATUS.to_owned();
        assert!(r.is_finalized());
    }

    #[test]
    fn test_serde_field_names() {
        let r = record("A", "2024-01-01T10:00:00+09:00");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["product_order_id"], "A");
        assert_eq!(json["quantity"], 1);

        let back: OrderRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
