//! Naver Commerce API client.
//!
//! Covers everything the dashboard pulls from the platform: signed token
//! exchange, the changed-order scan, and the product catalog.
//!
//! # Architecture
//!
//! - Token requests are signed with the client secret (a bcrypt salt string)
//!   and exchanged for a bearer token, cached until shortly before expiry
//! - Order scans fan out over day-sized windows with bounded concurrency and
//!   a deadline; window failures are skipped, results may be partial
//! - Product catalog responses are cached for 5 minutes

pub mod auth;
pub mod client;
pub mod convert;
pub mod orders;
pub mod products;

pub use client::CommerceClient;
pub use convert::{filter_finalized, normalize_order, normalize_orders};
pub use orders::RawOrderItem;

use thiserror::Error;

/// Base URL of the external Commerce API.
pub(crate) const API_BASE: &str = "https://api.commerce.naver.com/external";

/// Errors that can occur when interacting with the Commerce API.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The client secret is not a usable bcrypt salt string.
    #[error("Invalid client secret: {0}")]
    InvalidClientSecret(String),

    /// Token endpoint rejected the signed request or returned no token.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API returned a non-success status.
    #[error("API error (HTTP {status}): {body}")]
    Api {
        /// HTTP status returned by the platform.
        status: reqwest::StatusCode,
        /// Response body, truncated for logging.
        body: String,
    },
}
