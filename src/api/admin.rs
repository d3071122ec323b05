use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::{AdminUser, AppState};
use crate::admin::{self as backoffice, DashboardStats};
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<DashboardStats>> {
    Ok(Json(backoffice::dashboard(&state.stores).await?))
}
