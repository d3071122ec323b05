use axum::extract::{Path, State};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use super::{AdminUser, AppState};
use crate::domain::Notification;
use crate::{Result, ShopError};

const FEED_LIMIT: usize = 50;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(feed))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
        .route("/:id", delete(remove))
}

fn not_found() -> ShopError { ShopError::NotFound("Notification not found".to_string()) }

#[derive(Serialize)]
struct Message { message: &'static str }

async fn feed(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<Notification>>> {
    Ok(Json(state.stores.notifications.recent_notifications(FEED_LIMIT).await?))
}

#[derive(Serialize)]
struct UnreadCount { count: u64 }

async fn unread_count(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<UnreadCount>> {
    Ok(Json(UnreadCount { count: state.stores.notifications.unread_count().await? }))
}

async fn mark_read(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<Json<Notification>> {
    state.stores.notifications.mark_read(id).await?.map(Json).ok_or_else(not_found)
}

async fn mark_all_read(State(state): State<AppState>, AdminUser(admin): AdminUser) -> Result<Json<Message>> {
    let updated = state.stores.notifications.mark_all_read().await?;
    tracing::debug!(admin_id = %admin.id, updated, "notifications marked read");
    Ok(Json(Message { message: "All notifications marked as read" }))
}

async fn remove(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<Json<Message>> {
    if !state.stores.notifications.delete_notification(id).await? { return Err(not_found()); }
    Ok(Json(Message { message: "Notification deleted successfully" }))
}
