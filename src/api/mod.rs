//! REST surface mounted under `/api`.

mod admin;
mod auth;
mod error;
mod extract;
mod notifications;
mod orders;
mod payment;
mod products;

pub use error::ValidJson;
pub use extract::{AdminUser, CurrentUser};

use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::TokenSigner;
use crate::store::Stores;
use crate::workflow::OrderWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub workflow: OrderWorkflow,
    pub tokens: TokenSigner,
    /// Adds the error chain to 500 responses.
    pub development: bool,
}

/// Every route under `/api`, with request tracing. CORS is layered on by the binary.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::routes())
        .nest("/products", products::routes())
        .nest("/orders", orders::routes())
        .nest("/payment", payment::routes())
        .nest("/notifications", notifications::routes())
        .nest("/admin", admin::routes());
    Router::new()
        .nest("/api", api)
        .layer(middleware::map_response_with_state(state.development, error::expose_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}
