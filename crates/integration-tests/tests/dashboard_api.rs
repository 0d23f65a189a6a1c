//! Integration tests against a running dashboard.
//!
//! These tests require:
//! - The dashboard server running (cargo run -p smartstore-dashboard)
//! - `ADMIN_USERNAME` / `ADMIN_PASSWORD` matching the server's credentials
//! - For the data tests, valid commerce API credentials in the server's
//!   environment
//!
//! Run with: cargo test -p smartstore-integration-tests -- --ignored

use reqwest::{Client, StatusCode, redirect};
use serde_json::Value;

/// Base URL for the dashboard (configurable via environment).
fn base_url() -> String {
    std::env::var("DASHBOARD_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A client that keeps the session cookie but never follows redirects, so
/// the login round trips stay observable.
fn bare_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Log in with the configured admin credentials and return the client
/// carrying the session cookie.
async fn authenticated_client() -> Client {
    let client = bare_client();
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("ADMIN_PASSWORD").expect("ADMIN_PASSWORD must be set");

    let resp = client
        .post(format!("{}/login", base_url()))
        .form(&[("username", username.as_str()), ("password", password.as_str())])
        .send()
        .await
        .expect("Failed to post login form");

    assert!(resp.status().is_redirection(), "login was not accepted");
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(location, "/", "login redirected to {location}");
    client
}

// ============================================================================
// Health & Authentication
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running dashboard server"]
async fn test_health_endpoint() {
    let resp = bare_client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to reach health endpoint");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
#[ignore = "Requires a running dashboard server"]
async fn test_pages_redirect_anonymous_visitors() {
    let client = bare_client();

    for path in ["/", "/orders"] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to request page");

        assert!(resp.status().is_redirection(), "{path} did not redirect");
        let location = resp
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert_eq!(location, "/login");
    }
}

#[tokio::test]
#[ignore = "Requires a running dashboard server"]
async fn test_api_rejects_anonymous_requests_with_json() {
    let resp = bare_client()
        .get(format!("{}/api/orders", base_url()))
        .send()
        .await
        .expect("Failed to request API");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
#[ignore = "Requires a running dashboard server"]
async fn test_login_rejects_bad_credentials() {
    let resp = bare_client()
        .post(format!("{}/login", base_url()))
        .form(&[("username", "admin"), ("password", "definitely-wrong")])
        .send()
        .await
        .expect("Failed to post login form");

    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(location, "/login?error=credentials");
}

// ============================================================================
// Data Endpoints
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running dashboard server and commerce credentials"]
async fn test_products_payload_shape() {
    let client = authenticated_client().await;

    let resp = client
        .get(format!("{}/api/products", base_url()))
        .send()
        .await
        .expect("Failed to request products");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse body");
    let products = body["products"].as_array().expect("products should be an array");

    for product in products {
        assert!(product["name"].is_string());
        assert!(product["total_stock"].is_i64());
        assert!(product["options"].is_array());
    }
}

#[tokio::test]
#[ignore = "Requires a running dashboard server and commerce credentials"]
async fn test_orders_are_cached_between_requests() {
    let client = authenticated_client().await;

    let first = client
        .get(format!("{}/api/orders", base_url()))
        .send()
        .await
        .expect("Failed to request orders");
    assert_eq!(first.status(), StatusCode::OK);
    let first: Value = first.json().await.expect("Failed to parse body");
    assert!(first["orders"].is_array());

    // The second request lands inside the staleness window and must be
    // answered from the snapshot.
    let second = client
        .get(format!("{}/api/orders", base_url()))
        .send()
        .await
        .expect("Failed to request orders");
    let second: Value = second.json().await.expect("Failed to parse body");
    let message = second["message"].as_str().expect("message should be a string");
    assert!(message.contains("cache"), "unexpected message: {message}");
}

#[tokio::test]
#[ignore = "Requires a running dashboard server and commerce credentials"]
async fn test_manual_sync_reports_a_summary() {
    let client = authenticated_client().await;

    let resp = client
        .get(format!("{}/api/orders?sync=true&days=1", base_url()))
        .send()
        .await
        .expect("Failed to request sync");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse body");
    let message = body["message"].as_str().expect("message should be a string");
    assert!(message.contains("Synced"), "unexpected message: {message}");
}
