//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::commerce::{CommerceClient, CommerceError};
use crate::config::DashboardConfig;
use crate::orders::OrderService;
use crate::sheets::SheetsClient;

/// Timeout for the outbound ip echo lookup.
const IP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration and the upstream clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    commerce: CommerceClient,
    orders: OrderService,
    ip_probe: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The sheet client is optional; without one the order service runs
    /// cache-only.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(
        config: DashboardConfig,
        sheets: Option<SheetsClient>,
    ) -> Result<Self, CommerceError> {
        let commerce = CommerceClient::new(&config.commerce)?;
        let orders = OrderService::new(commerce.clone(), sheets, &config.orders);
        let ip_probe = reqwest::Client::builder()
            .timeout(IP_PROBE_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                commerce,
                orders,
                ip_probe,
            }),
        })
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// Get a reference to the commerce API client.
    #[must_use]
    pub fn commerce(&self) -> &CommerceClient {
        &self.inner.commerce
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Get a reference to the plain HTTP client used for the ip echo.
    #[must_use]
    pub fn ip_probe(&self) -> &reqwest::Client {
        &self.inner.ip_probe
    }
}
