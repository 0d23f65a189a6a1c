//! Integration tests for the SmartStore dashboard.
//!
//! # Test Categories
//!
//! - `order_pipeline` - Offline tests that push raw pay-order payloads
//!   through normalization, filtering and reconciliation. These run in a
//!   plain `cargo test`.
//! - `dashboard_api` - Tests against a running dashboard instance. These
//!   are `#[ignore]`d by default because they need a server and, for the
//!   authenticated ones, real commerce credentials.
//!
//! # Running Tests
//!
//! ```bash
//! # Offline pipeline tests
//! cargo test -p smartstore-integration-tests
//!
//! # Live tests against a local server
//! cargo run -p smartstore-dashboard &
//! cargo test -p smartstore-integration-tests -- --ignored
//! ```
//!
//! The live tests read `DASHBOARD_BASE_URL` (default `http://localhost:5000`)
//! and log in with `ADMIN_USERNAME` / `ADMIN_PASSWORD`.
