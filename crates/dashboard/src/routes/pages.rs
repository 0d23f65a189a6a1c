//! Dashboard page handlers.
//!
//! Pages render shells; data loads through the `/api` endpoints from the
//! page scripts.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::middleware::RequireAuth;

/// Inventory page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct InventoryTemplate {
    pub username: String,
}

/// Order dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub username: String,
}

/// Inventory overview.
pub async fn inventory(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    InventoryTemplate {
        username: user.username,
    }
}

/// Order dashboard.
pub async fn orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    OrdersTemplate {
        username: user.username,
    }
}
