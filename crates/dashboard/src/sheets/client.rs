//! Sheets and Drive HTTP plumbing.
//!
//! Holds the HTTP client, the cached bearer token and the resolved
//! spreadsheet coordinates (id and first worksheet title). The row-level
//! sync operations live in [`super::sync`].

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use super::auth::{self, ServiceAccountKey, SheetsToken};
use super::sync::StatusUpdate;
use super::{DRIVE_API_BASE, SHEETS_API_BASE, SheetsError};
use crate::config::SheetsConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body carried into a [`SheetsError::Api`].
const ERROR_BODY_LIMIT: usize = 300;

/// Columns the mirror occupies, A through H.
const DATA_COLUMNS: &str = "A:H";

/// Google Sheets client bound to one spreadsheet.
///
/// Cloning is cheap; clones share the token and the resolved coordinates.
#[derive(Clone)]
pub struct SheetsClient {
    inner: Arc<SheetsClientInner>,
}

struct SheetsClientInner {
    client: reqwest::Client,
    key: ServiceAccountKey,
    spreadsheet_name: String,
    token: RwLock<Option<SheetsToken>>,
    /// Configured up front or discovered through Drive on first use
    spreadsheet_id: RwLock<Option<String>>,
    /// Title of the first worksheet, resolved on first use
    worksheet: RwLock<Option<String>>,
}

impl SheetsClient {
    /// Load the service-account key and build a client.
    ///
    /// # Errors
    ///
    /// Fails when the key file cannot be read or parsed, or when the HTTP
    /// client cannot be built. No network call is made yet.
    pub async fn connect(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let key = ServiceAccountKey::load(&config.service_account_file).await?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SheetsClientInner {
                client,
                key,
                spreadsheet_name: config.spreadsheet_name.clone(),
                token: RwLock::new(None),
                spreadsheet_id: RwLock::new(config.spreadsheet_id.clone()),
                worksheet: RwLock::new(None),
            }),
        })
    }

    /// The spreadsheet this client mirrors into.
    #[must_use]
    pub fn spreadsheet_name(&self) -> &str {
        &self.inner.spreadsheet_name
    }

    // =========================================================================
    // Authentication and coordinates
    // =========================================================================

    async fn bearer(&self) -> Result<SecretString, SheetsError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }

        let mut slot = self.inner.token.write().await;
        if let Some(token) = slot.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }

        let token = auth::authenticate(&self.inner.client, &self.inner.key).await?;
        let bearer = token.token.clone();
        *slot = Some(token);
        Ok(bearer)
    }

    async fn spreadsheet_id(&self) -> Result<String, SheetsError> {
        if let Some(id) = self.inner.spreadsheet_id.read().await.as_ref() {
            return Ok(id.clone());
        }

        let mut slot = self.inner.spreadsheet_id.write().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }

        let id = self.find_spreadsheet().await?;
        tracing::info!(spreadsheet_id = %id, "resolved spreadsheet by name");
        *slot = Some(id.clone());
        Ok(id)
    }

    /// Look the spreadsheet up by name through the Drive files listing.
    async fn find_spreadsheet(&self) -> Result<String, SheetsError> {
        let name = &self.inner.spreadsheet_name;
        let files: FileList = self
            .get_json(
                DRIVE_API_BASE,
                &[
                    ("q", drive_query(name)),
                    ("fields", "files(id, name)".to_string()),
                    ("pageSize", "1".to_string()),
                ],
            )
            .await?;

        files
            .files
            .into_iter()
            .map(|file| file.id)
            .find(|id| !id.is_empty())
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(name.clone()))
    }

    /// Title of the first worksheet; the mirror always uses the first one.
    async fn worksheet_title(&self) -> Result<String, SheetsError> {
        if let Some(title) = self.inner.worksheet.read().await.as_ref() {
            return Ok(title.clone());
        }

        let mut slot = self.inner.worksheet.write().await;
        if let Some(title) = slot.as_ref() {
            return Ok(title.clone());
        }

        let id = self.spreadsheet_id().await?;
        let meta: SpreadsheetMeta = self
            .get_json(
                &format!("{SHEETS_API_BASE}/{id}"),
                &[("fields", "sheets(properties(title))".to_string())],
            )
            .await?;

        let title = meta
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .find(|title| !title.is_empty())
            .unwrap_or_else(|| "Sheet1".to_string());
        *slot = Some(title.clone());
        Ok(title)
    }

    async fn data_range(&self) -> Result<String, SheetsError> {
        let title = self.worksheet_title().await?;
        Ok(format!("'{}'!{DATA_COLUMNS}", escape_title(&title)))
    }

    // =========================================================================
    // Values primitives
    // =========================================================================

    /// Read the full mirrored range, header row included. An empty sheet
    /// yields no rows.
    pub(crate) async fn read_rows(&self) -> Result<Vec<Vec<Value>>, SheetsError> {
        let id = self.spreadsheet_id().await?;
        let range = self.data_range().await?;
        let response: ValueRange = self
            .get_json(&format!("{SHEETS_API_BASE}/{id}/values/{range}"), &[])
            .await?;
        Ok(response.values)
    }

    /// Append `rows` below the current data in one call.
    pub(crate) async fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), SheetsError> {
        let id = self.spreadsheet_id().await?;
        let range = self.data_range().await?;
        let url = format!("{SHEETS_API_BASE}/{id}/values/{range}:append");

        let _: Value = self
            .post_json_with_query(
                &url,
                &[
                    ("valueInputOption", "RAW"),
                    ("insertDataOption", "INSERT_ROWS"),
                ],
                &json!({ "values": rows }),
            )
            .await?;
        Ok(())
    }

    /// Rewrite the status cells named by `updates` in one batch call.
    pub(crate) async fn update_statuses(&self, updates: &[StatusUpdate]) -> Result<(), SheetsError> {
        let id = self.spreadsheet_id().await?;
        let title = self.worksheet_title().await?;

        let data: Vec<Value> = updates
            .iter()
            .map(|update| {
                json!({
                    "range": format!("'{}'!H{}", escape_title(&title), update.row),
                    "values": [[update.status]],
                })
            })
            .collect();
        let body = json!({ "valueInputOption": "RAW", "data": data });

        let _: Value = self
            .post_json_with_query(
                &format!("{SHEETS_API_BASE}/{id}/values:batchUpdate"),
                &[],
                &body,
            )
            .await?;
        Ok(())
    }

    /// Clear the mirrored range, header row included.
    pub(crate) async fn clear_rows(&self) -> Result<(), SheetsError> {
        let id = self.spreadsheet_id().await?;
        let range = self.data_range().await?;
        let _: Value = self
            .post_json_with_query(
                &format!("{SHEETS_API_BASE}/{id}/values/{range}:clear"),
                &[],
                &json!({}),
            )
            .await?;
        Ok(())
    }

    // =========================================================================
    // REST helpers
    // =========================================================================

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SheetsError> {
        let bearer = self.bearer().await?;
        let response = self
            .inner
            .client
            .get(url)
            .query(query)
            .bearer_auth(bearer.expose_secret())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn post_json_with_query<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, SheetsError> {
        let bearer = self.bearer().await?;
        let response = self
            .inner
            .client
            .post(url)
            .query(query)
            .bearer_auth(bearer.expose_secret())
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SheetsError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SheetsError::Api {
                status,
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        serde_json::from_str(&body).map_err(SheetsError::from)
    }
}

/// Drive query matching a live spreadsheet by exact name.
fn drive_query(name: &str) -> String {
    format!(
        "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
        name.replace('\'', "\\'")
    )
}

/// Worksheet titles are quoted in A1 ranges; embedded quotes double up.
fn escape_title(title: &str) -> String {
    title.replace('\'', "''")
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ValueRange {
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FileList {
    files: Vec<DriveFile>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SpreadsheetMeta {
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SheetProperties {
    title: String,
}
