//! JSON API handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::orders::DEFAULT_FETCH_DAYS;
use crate::state::AppState;

const IP_ECHO_ENDPOINT: &str = "https://api.ipify.org?format=json";

/// Query parameters for the orders endpoint.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    /// Fetch a fresh window from the platform instead of serving the
    /// cache.
    #[serde(default)]
    pub sync: bool,
    /// Days to scan when syncing (capped at 90).
    pub days: Option<u32>,
    /// Days to skip before the scanned range.
    pub offset: Option<u32>,
    /// Rebuild the cache and the sheet from this fetch alone.
    #[serde(default)]
    pub replace: bool,
}

/// Product catalog with per-option stock.
pub async fn products(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let products = state.commerce().product_list().await?;
    Ok(Json(json!({ "products": &*products })).into_response())
}

/// Serve orders from the snapshot, or fetch a window when `sync=true`.
///
/// A failed refresh reports the stale snapshot next to the error so the
/// page keeps rendering data.
pub async fn orders(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Response {
    let service = state.orders();

    let result = if query.sync {
        service
            .sync(
                query.days.unwrap_or(DEFAULT_FETCH_DAYS),
                query.offset.unwrap_or(0),
                query.replace,
            )
            .await
            .map(|outcome| (outcome.orders, outcome.message))
    } else {
        service.get_orders(false).await.map(|(orders, source)| {
            let message = format!("{} orders served from {}", orders.len(), source.label());
            (orders, message)
        })
    };

    match result {
        Ok((orders, message)) => {
            Json(json!({ "orders": orders, "message": message })).into_response()
        }
        Err(refresh) => {
            // Not routed through AppError: the stale snapshot rides along
            // with the error body.
            tracing::error!(error = %refresh, "orders request failed");
            sentry::capture_error(&refresh);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": refresh.error.to_string(),
                    "orders": refresh.stale,
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpEcho {
    #[serde(default)]
    ip: String,
}

/// Outbound IP echo.
///
/// The commerce API only accepts calls from allowlisted addresses; this
/// reports the address to register.
pub async fn server_ip(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let echo: IpEcho = state
        .ip_probe()
        .get(IP_ECHO_ENDPOINT)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("ip lookup failed: {e}")))?
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("ip lookup failed: {e}")))?;

    Ok(Json(json!({
        "server_ip": echo.ip,
        "message": "Register this IP in the commerce API allowlist",
    }))
    .into_response())
}
