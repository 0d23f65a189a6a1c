//! Normalization from wire order items to [`OrderRecord`]s.
//!
//! The pay-order endpoints spread one logical order over two objects and
//! omit fields freely. Normalization flattens the pair, fills the gaps with
//! stable fallbacks and drops items that cannot be identified at all.

use smartstore_core::{MISSING_FIELD, OrderRecord};

use super::orders::RawOrderItem;

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Flatten a raw order item into an [`OrderRecord`].
///
/// Returns `None` when the item has no product-order id, since such a
/// record could never be updated or deduplicated later. The buyer name
/// prefers the shipping recipient over the orderer, matching what the
/// dashboard shows next to a shipment.
pub fn normalize_order(item: RawOrderItem) -> Option<OrderRecord> {
    let product_order = item.product_order;
    let order = item.order;

    let product_order_id = product_order.product_order_id;
    if product_order_id.is_empty() {
        return None;
    }

    let buyer_name = non_empty(product_order.shipping_address.and_then(|addr| addr.name))
        .or_else(|| non_empty(order.orderer_name))
        .unwrap_or_else(|| MISSING_FIELD.to_string());

    let order_date = non_empty(order.order_date)
        .or_else(|| non_empty(product_order.place_order_date))
        .unwrap_or_else(|| MISSING_FIELD.to_string());

    Some(OrderRecord {
        product_order_id,
        order_id: non_empty(order.order_id).unwrap_or_else(|| MISSING_FIELD.to_string()),
        order_date,
        product_name: non_empty(product_order.product_name)
            .unwrap_or_else(|| MISSING_FIELD.to_string()),
        product_option: product_order.product_option.unwrap_or_default(),
        quantity: product_order.quantity.unwrap_or(0),
        buyer_name,
        status: non_empty(product_order.product_order_status)
            .unwrap_or_else(|| MISSING_FIELD.to_string()),
    })
}

/// Normalize a batch, dropping unidentifiable items.
pub fn normalize_orders(items: Vec<RawOrderItem>) -> Vec<OrderRecord> {
    items.into_iter().filter_map(normalize_order).collect()
}

/// Drop finalized orders unless the dashboard is configured to keep them.
#[must_use]
pub fn filter_finalized(records: Vec<OrderRecord>, include_finalized: bool) -> Vec<OrderRecord> {
    if include_finalized {
        return records;
    }
    records
        .into_iter()
        .filter(|record| !record.is_finalized())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smartstore_core::FINALIZED_STATUS;

    use super::*;
    use crate::commerce::orders::{RawOrder, RawProductOrder, RawShippingAddress};

    fn raw_item(id: &str) -> RawOrderItem {
        RawOrderItem {
            product_order: RawProductOrder {
                product_order_id: id.to_string(),
                product_order_status: Some("PAYED".to_string()),
                product_name: Some("Hand Cream".to_string()),
                product_option: Some("Scent: Fig".to_string()),
                quantity: Some(2),
                place_order_date: Some("2026-01-01T10:00:00.000+09:00".to_string()),
                shipping_address: Some(RawShippingAddress {
                    name: Some("Kim Minji".to_string()),
                }),
            },
            order: RawOrder {
                order_id: Some("ORD-1".to_string()),
                order_date: Some("2026-01-01T09:59:58.000+09:00".to_string()),
                orderer_name: Some("Kim Minji".to_string()),
            },
        }
    }

    #[test]
    fn test_normalize_flattens_both_halves() {
        let record = normalize_order(raw_item("P-1")).unwrap();

        assert_eq!(record.product_order_id, "P-1");
        assert_eq!(record.order_id, "ORD-1");
        assert_eq!(record.order_date, "2026-01-01T09:59:58.000+09:00");
        assert_eq!(record.product_name, "Hand Cream");
        assert_eq!(record.product_option, "Scent: Fig");
        assert_eq!(record.quantity, 2);
        assert_eq!(record.buyer_name, "Kim Minji");
        assert_eq!(record.status, "PAYED");
    }

    #[test]
    fn test_missing_id_drops_the_item() {
        assert!(normalize_order(raw_item("")).is_none());
    }

    #[test]
    fn test_buyer_falls_back_to_orderer_then_placeholder() {
        let mut item = raw_item("P-1");
        item.product_order.shipping_address = None;
        item.order.orderer_name = Some("Lee Jisoo".to_string());
        assert_eq!(normalize_order(item).unwrap().buyer_name, "Lee Jisoo");

        let mut item = raw_item("P-1");
        item.product_order.shipping_address = Some(RawShippingAddress {
            name: Some(String::new()),
        });
        item.order.orderer_name = None;
        assert_eq!(normalize_order(item).unwrap().buyer_name, MISSING_FIELD);
    }

    #[test]
    fn test_order_date_falls_back_to_place_order_date() {
        let mut item = raw_item("P-1");
        item.order.order_date = None;
        assert_eq!(
            normalize_order(item).unwrap().order_date,
            "2026-01-01T10:00:00.000+09:00"
        );

        let mut item = raw_item("P-1");
        item.order.order_date = None;
        item.product_order.place_order_date = None;
        assert_eq!(normalize_order(item).unwrap().order_date, MISSING_FIELD);
    }

    #[test]
    fn test_missing_fields_get_stable_fallbacks() {
        let item = RawOrderItem {
            product_order: RawProductOrder {
                product_order_id: "P-2".to_string(),
                ..RawProductOrder::default()
            },
            order: RawOrder::default(),
        };
        let record = normalize_order(item).unwrap();

        assert_eq!(record.order_id, MISSING_FIELD);
        assert_eq!(record.product_name, MISSING_FIELD);
        assert_eq!(record.product_option, "");
        assert_eq!(record.quantity, 0);
        assert_eq!(record.status, MISSING_FIELD);
    }

    #[test]
    fn test_normalize_orders_drops_only_unidentifiable_items() {
        let items = vec![raw_item("P-1"), raw_item(""), raw_item("P-3")];
        let records = normalize_orders(items);
        let ids: Vec<_> = records.iter().map(|r| r.product_order_id.as_str()).collect();
        assert_eq!(ids, vec!["P-1", "P-3"]);
    }

    #[test]
    fn test_filter_finalized_respects_configuration() {
        let mut finalized = raw_item("P-1");
        finalized.product_order.product_order_status = Some(FINALIZED_STATUS.to_string());
        let records = normalize_orders(vec![finalized, raw_item("P-2")]);

        let kept = filter_finalized(records.clone(), false);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].product_order_id, "P-2");

        let kept = filter_finalized(records, true);
        assert_eq!(kept.len(), 2);
    }
}
