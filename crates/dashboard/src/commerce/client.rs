//! Commerce API HTTP client.
//!
//! Owns the reqwest client, the cached bearer token, and the product catalog
//! cache. The order and product methods live in sibling modules as `impl`
//! blocks on [`CommerceClient`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use smartstore_core::ProductSummary;

use super::auth::{self, AccessToken};
use super::{API_BASE, CommerceError};
use crate::config::CommerceConfig;

/// Per-request timeout for Commerce API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a product catalog response is served from cache.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Longest error body carried into a [`CommerceError::Api`].
const ERROR_BODY_LIMIT: usize = 300;

/// Naver Commerce API client.
///
/// Holds the application credentials, a cached bearer token, and a 5-minute
/// product catalog cache. Cloning is cheap; clones share both caches.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    /// In-memory token cache
    token: RwLock<Option<AccessToken>>,
    /// Product catalog responses keyed by request shape
    product_cache: Cache<String, Arc<Vec<ProductSummary>>>,
}

impl CommerceClient {
    /// Create a client from application credentials.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Http` if the HTTP client cannot be built.
    pub fn new(config: &CommerceConfig) -> Result<Self, CommerceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let product_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                token: RwLock::new(None),
                product_cache,
            }),
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Get a valid bearer token, re-authenticating when the cached one is
    /// missing or expired.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::AuthenticationFailed` when the platform
    /// rejects the signed request.
    pub(crate) async fn bearer(&self) -> Result<SecretString, CommerceError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }

        let mut slot = self.inner.token.write().await;
        // Another caller may have re-authenticated while we waited.
        if let Some(token) = slot.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }

        let token = auth::authenticate(
            &self.inner.client,
            &self.inner.client_id,
            &self.inner.client_secret,
        )
        .await?;
        tracing::debug!(expires_at = token.expires_at, "obtained commerce bearer token");

        let bearer = token.token.clone();
        *slot = Some(token);
        Ok(bearer)
    }

    /// Whether a non-expired bearer token is currently cached.
    pub async fn has_valid_token(&self) -> bool {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .is_some_and(|token| !token.is_expired())
    }

    // =========================================================================
    // REST helpers
    // =========================================================================

    /// GET `path` with bearer auth and parse the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CommerceError> {
        let bearer = self.bearer().await?;
        let response = self
            .inner
            .client
            .get(format!("{API_BASE}{path}"))
            .query(query)
            .bearer_auth(bearer.expose_secret())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// POST a JSON body to `path` with bearer auth and parse the response.
    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CommerceError> {
        let bearer = self.bearer().await?;
        let response = self
            .inner
            .client
            .post(format!("{API_BASE}{path}"))
            .bearer_auth(bearer.expose_secret())
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Check the status and parse the body, keeping error bodies for
    /// diagnostics.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CommerceError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CommerceError::Api {
                status,
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        serde_json::from_str(&body).map_err(CommerceError::from)
    }

    pub(crate) fn product_cache(&self) -> &Cache<String, Arc<Vec<ProductSummary>>> {
        &self.inner.product_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CommerceConfig {
        CommerceConfig {
            client_id: "client-id".to_string(),
            client_secret: SecretString::from("$2a$04$N9qo8uLOickgx2ZMRZoMye"),
        }
    }

    #[tokio::test]
    async fn test_client_starts_without_token() {
        let client = CommerceClient::new(&test_config()).expect("client builds");
        assert!(!client.has_valid_token().await);
    }

    #[tokio::test]
    async fn test_cached_token_is_reported_valid() {
        let client = CommerceClient::new(&test_config()).expect("client builds");
        *client.inner.token.write().await = Some(AccessToken {
            token: SecretString::from("bearer"),
            expires_at: chrono::Utc::now().timestamp() + 3600,
        });
        assert!(client.has_valid_token().await);
    }
}
