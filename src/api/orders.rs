use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AppState, CurrentUser, ValidJson};
use crate::domain::{Order, ShippingAddress};
use crate::workflow::{OrderLine, PlaceOrder};
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mine).post(create))
        .route("/all", get(list_all))
        .route("/:id", get(show).put(update_status).delete(cancel))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
struct CreateOrderRequest {
    products: Vec<OrderLine>,
    payment_method: String,
    shipping_address: ShippingAddress,
}

async fn create(State(state): State<AppState>, CurrentUser(user): CurrentUser, ValidJson(req): ValidJson<CreateOrderRequest>) -> Result<(StatusCode, Json<Order>)> {
    let input = PlaceOrder { lines: req.products, payment_method: req.payment_method, shipping_address: req.shipping_address };
    let placed = state.workflow.place_order(&user, input).await?;
    Ok((StatusCode::CREATED, Json(placed.order)))
}

async fn list_mine(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.workflow.orders_of(&user).await?))
}

async fn list_all(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.workflow.all_orders(&user).await?))
}

async fn show(State(state): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(state.workflow.order_for(&user, id).await?))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct StatusRequest { status: String }

async fn update_status(State(state): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>, ValidJson(req): ValidJson<StatusRequest>) -> Result<Json<Order>> {
    let update = state.workflow.update_status(&user, id, &req.status).await?;
    Ok(Json(update.order))
}

#[derive(Serialize)]
struct Cancelled { message: &'static str, order: Order }

async fn cancel(State(state): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Cancelled>> {
    let order = state.workflow.cancel_order(&user, id).await?;
    Ok(Json(Cancelled { message: "Order cancelled successfully", order }))
}
