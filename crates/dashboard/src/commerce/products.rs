//! Product catalog fetch with per-product option stock.
//!
//! The search endpoint lists channel products but carries no option stock,
//! so each product with an origin-product number gets a follow-up detail
//! request. Option data moved between three shapes across platform
//! revisions; [`parse_origin_options`] tries them newest-first.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use smartstore_core::{MISSING_FIELD, ProductOption, ProductSummary};

use super::CommerceError;
use super::client::CommerceClient;

const PRODUCT_SEARCH_ENDPOINT: &str = "/v1/products/search";
const ORIGIN_PRODUCT_ENDPOINT: &str = "/v2/products/origin-products";

/// Catalog page size; the dashboard shows a single page.
const SEARCH_PAGE_SIZE: u32 = 50;

/// Detail requests in flight at once.
const MAX_CONCURRENT_DETAILS: usize = 10;

const CATALOG_CACHE_KEY: &str = "catalog:sale";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProductSearchResponse {
    contents: Vec<SearchContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchContent {
    channel_products: Vec<ChannelProduct>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChannelProduct {
    name: Option<String>,
    status_type: Option<String>,
    sale_price: Option<i64>,
    stock_quantity: Option<i64>,
    origin_product_no: Option<i64>,
}

// =============================================================================
// Catalog fetch
// =============================================================================

impl CommerceClient {
    /// Products currently on sale, with per-option stock, served from a
    /// 5-minute cache.
    ///
    /// # Errors
    ///
    /// Returns an error when the search request itself fails; a failed
    /// detail lookup only leaves that product without options.
    #[instrument(skip(self))]
    pub async fn product_list(&self) -> Result<Arc<Vec<ProductSummary>>, CommerceError> {
        if let Some(products) = self.product_cache().get(CATALOG_CACHE_KEY).await {
            tracing::debug!("Cache hit for product catalog");
            return Ok(products);
        }

        let products = Arc::new(self.fetch_catalog().await?);
        self.product_cache()
            .insert(CATALOG_CACHE_KEY.to_string(), Arc::clone(&products))
            .await;
        Ok(products)
    }

    async fn fetch_catalog(&self) -> Result<Vec<ProductSummary>, CommerceError> {
        let body = serde_json::json!({
            "productStatusTypes": ["SALE"],
            "page": 1,
            "size": SEARCH_PAGE_SIZE,
        });
        let response: ProductSearchResponse =
            self.post_json(PRODUCT_SEARCH_ENDPOINT, &body).await?;

        let channel_products: Vec<ChannelProduct> = response
            .contents
            .into_iter()
            .flat_map(|content| content.channel_products)
            .collect();
        tracing::debug!(products = channel_products.len(), "catalog search finished");

        // `buffered` keeps the catalog in search order.
        let summaries = stream::iter(channel_products)
            .map(|product| self.summarize(product))
            .buffered(MAX_CONCURRENT_DETAILS)
            .collect()
            .await;
        Ok(summaries)
    }

    async fn summarize(&self, product: ChannelProduct) -> ProductSummary {
        let options = match product.origin_product_no {
            Some(no) => self.product_options(no).await,
            None => Vec::new(),
        };
        ProductSummary {
            name: product.name.unwrap_or_else(|| MISSING_FIELD.to_string()),
            status: product
                .status_type
                .unwrap_or_else(|| MISSING_FIELD.to_string()),
            price: product.sale_price.unwrap_or(0),
            total_stock: product.stock_quantity.unwrap_or(0),
            origin_product_no: product.origin_product_no,
            options,
        }
    }

    async fn product_options(&self, origin_product_no: i64) -> Vec<ProductOption> {
        let path = format!("{ORIGIN_PRODUCT_ENDPOINT}/{origin_product_no}");
        match self.get_json::<Value>(&path, &[]).await {
            Ok(detail) => parse_origin_options(&detail),
            Err(error) => {
                tracing::warn!(%error, origin_product_no, "product detail fetch failed");
                Vec::new()
            }
        }
    }
}

// =============================================================================
// Option extraction
// =============================================================================

/// Extract option stock from an origin-product detail document.
///
/// The detail either wraps the product under `originProduct` or is the
/// product itself. Options live in one of three places depending on the
/// product's age: combination options under
/// `detailAttribute.optionInfo.optionCombinations`, or flat lists under
/// `productOptionList` or `options`.
fn parse_origin_options(detail: &Value) -> Vec<ProductOption> {
    let origin = detail.get("originProduct").unwrap_or(detail);

    if let Some(combinations) = origin
        .pointer("/detailAttribute/optionInfo/optionCombinations")
        .and_then(Value::as_array)
        && !combinations.is_empty()
    {
        return combinations.iter().map(combination_option).collect();
    }

    for key in ["productOptionList", "options"] {
        if let Some(entries) = origin.get(key).and_then(Value::as_array)
            && !entries.is_empty()
        {
            return entries.iter().map(list_option).collect();
        }
    }

    Vec::new()
}

/// Combination options name up to four dimensions.
fn combination_option(entry: &Value) -> ProductOption {
    let parts: Vec<&str> = ["optionName1", "optionName2", "optionName3", "optionName4"]
        .iter()
        .filter_map(|key| non_empty_str(entry, key))
        .collect();
    ProductOption {
        name: display_name(&parts),
        stock: stock_quantity(entry),
    }
}

/// Flat option lists spread the name over several keys, sometimes repeating
/// the same value under more than one of them.
fn list_option(entry: &Value) -> ProductOption {
    let mut parts: Vec<&str> = Vec::new();
    for key in ["name", "optionName", "name1", "name2", "name3"] {
        if let Some(value) = non_empty_str(entry, key)
            && !parts.contains(&value)
        {
            parts.push(value);
        }
    }
    ProductOption {
        name: display_name(&parts),
        stock: stock_quantity(entry),
    }
}

fn non_empty_str<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn display_name(parts: &[&str]) -> String {
    if parts.is_empty() {
        MISSING_FIELD.to_string()
    } else {
        parts.join(" / ")
    }
}

fn stock_quantity(entry: &Value) -> i64 {
    entry
        .get("stockQuantity")
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_combination_options_join_dimensions() {
        let detail = json!({
            "originProduct": {
                "detailAttribute": {
                    "optionInfo": {
                        "optionCombinations": [
                            { "optionName1": "Fig", "optionName2": "50ml", "stockQuantity": 7 },
                            { "optionName1": "Rose", "optionName2": "50ml", "stockQuantity": 0 }
                        ]
                    }
                }
            }
        });

        let options = parse_origin_options(&detail);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].name, "Fig / 50ml");
        assert_eq!(options[0].stock, 7);
        assert_eq!(options[1].name, "Rose / 50ml");
        assert_eq!(options[1].stock, 0);
    }

    #[test]
    fn test_product_option_list_fallback() {
        let detail = json!({
            "originProduct": {
                "productOptionList": [
                    { "name": "Single", "stockQuantity": 3 }
                ]
            }
        });

        let options = parse_origin_options(&detail);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].name, "Single");
        assert_eq!(options[0].stock, 3);
    }

    #[test]
    fn test_options_list_dedups_repeated_name_keys() {
        let detail = json!({
            "options": [
                { "name": "Fig", "optionName": "Fig", "name1": "50ml", "stockQuantity": 2 }
            ]
        });

        let options = parse_origin_options(&detail);
        assert_eq!(options[0].name, "Fig / 50ml");
    }

    #[test]
    fn test_detail_without_wrapper_is_accepted() {
        let detail = json!({
            "productOptionList": [ { "optionName": "Refill", "stockQuantity": 12 } ]
        });

        let options = parse_origin_options(&detail);
        assert_eq!(options[0].name, "Refill");
        assert_eq!(options[0].stock, 12);
    }

    #[test]
    fn test_combinations_take_precedence_over_lists() {
        let detail = json!({
            "originProduct": {
                "detailAttribute": {
                    "optionInfo": {
                        "optionCombinations": [ { "optionName1": "Combo", "stockQuantity": 1 } ]
                    }
                },
                "productOptionList": [ { "name": "List", "stockQuantity": 9 } ]
            }
        });

        let options = parse_origin_options(&detail);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].name, "Combo");
    }

    #[test]
    fn test_nameless_option_gets_placeholder() {
        let detail = json!({
            "options": [ { "stockQuantity": 4 }, { "name": "", "stockQuantity": 1 } ]
        });

        let options = parse_origin_options(&detail);
        assert_eq!(options[0].name, MISSING_FIELD);
        assert_eq!(options[1].name, MISSING_FIELD);
    }

    #[test]
    fn test_missing_stock_defaults_to_zero() {
        let detail = json!({
            "options": [ { "name": "Fig" } ]
        });

        assert_eq!(parse_origin_options(&detail)[0].stock, 0);
    }

    #[test]
    fn test_product_without_options_yields_empty() {
        let detail = json!({ "originProduct": { "name": "Plain" } });
        assert!(parse_origin_options(&detail).is_empty());
    }

    #[test]
    fn test_search_response_flattens_channel_products() {
        let body = r#"{
            "contents": [
                { "channelProducts": [
                    { "name": "Hand Cream", "statusType": "SALE", "salePrice": 12000,
                      "stockQuantity": 40, "originProductNo": 123 }
                ] },
                { "channelProducts": [
                    { "name": "Lip Balm", "statusType": "SALE", "salePrice": 8000,
                      "stockQuantity": 15 }
                ] }
            ]
        }"#;

        let response: ProductSearchResponse = serde_json::from_str(body).unwrap();
        let products: Vec<ChannelProduct> = response
            .contents
            .into_iter()
            .flat_map(|content| content.channel_products)
            .collect();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].origin_product_no, Some(123));
        assert_eq!(products[1].origin_product_no, None);
        assert_eq!(products[1].sale_price, Some(8000));
    }
}
