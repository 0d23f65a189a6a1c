//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                - Inventory page
//! GET  /orders          - Order dashboard page
//! GET  /health          - Health check
//!
//! # Auth
//! GET  /login           - Login page
//! POST /login           - Login action
//! GET  /logout          - Logout action
//!
//! # API (session-gated)
//! GET  /api/products    - Product catalog with per-option stock
//! GET  /api/orders      - Cached orders; ?sync=true fetches a window
//! GET  /api/server-ip   - Outbound IP echo (for the API allowlist)
//! ```

pub mod api;
pub mod auth;
pub mod pages;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the page routes router.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::inventory))
        .route("/orders", get(pages::orders))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
}

/// Create the API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(api::products))
        .route("/orders", get(api::orders))
        .route("/server-ip", get(api::server_ip))
}

/// Create all routes for the dashboard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(page_routes())
        .merge(auth_routes())
        .nest("/api", api_routes())
}
