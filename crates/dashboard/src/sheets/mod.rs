//! Google Sheets order mirror.
//!
//! The dashboard mirrors order records into a spreadsheet so they survive
//! restarts and stay readable outside the app. Split into:
//!
//! - `auth`: service-account key loading and the signed-JWT token exchange
//! - `client`: Sheets/Drive HTTP plumbing, spreadsheet discovery by name
//! - `sync`: the row planner and the sync/rebuild/read operations

pub mod auth;
pub mod client;
pub mod sync;

pub use client::SheetsClient;
pub use sync::SyncSummary;

use thiserror::Error;

pub(crate) const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub(crate) const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3/files";

/// Errors from the spreadsheet mirror.
///
/// A mirror failure aborts the mirror step only; callers log it and keep
/// serving from the in-memory cache.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("failed to read service account key: {0}")]
    KeyFile(#[from] std::io::Error),

    #[error("failed to sign service account assertion: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("spreadsheet '{0}' not found")]
    SpreadsheetNotFound(String),

    #[error("API error (HTTP {status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}
