use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, CurrentUser, ValidJson};
use crate::domain::{Order, ShippingAddress};
use crate::payment::{GatewayIntent, SettlementProof};
use crate::workflow::{OrderLine, Placed, SettlePayment};
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify", post(verify))
        .route("/capture-order", post(capture_order))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct IntentRequest {
    #[validate(length(min = 1, message = "Products are required"))]
    products: Vec<OrderLine>,
}

#[derive(Serialize)]
struct IntentResponse {
    success: bool,
    #[serde(flatten)]
    intent: GatewayIntent,
}

async fn create_order(State(state): State<AppState>, CurrentUser(user): CurrentUser, ValidJson(req): ValidJson<IntentRequest>) -> Result<Json<IntentResponse>> {
    let intent = state.workflow.create_payment_intent(&user, &req.products).await?;
    Ok(Json(IntentResponse { success: true, intent }))
}

/// Razorpay checkout callback fields arrive in snake_case.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct VerifyRequest {
    #[validate(length(min = 1, message = "Payment details are incomplete"))]
    razorpay_order_id: String,
    #[validate(length(min = 1, message = "Payment details are incomplete"))]
    razorpay_payment_id: String,
    #[validate(length(min = 1, message = "Payment details are incomplete"))]
    razorpay_signature: String,
    #[validate(length(min = 1, message = "Products are required"))]
    products: Vec<OrderLine>,
    #[serde(rename = "shippingAddress")]
    shipping_address: ShippingAddress,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
struct CaptureRequest {
    #[validate(length(min = 1, message = "Order ID is required"))]
    order_id: String,
    #[validate(length(min = 1, message = "Products are required"))]
    products: Vec<OrderLine>,
    shipping_address: ShippingAddress,
}

#[derive(Serialize)]
struct Settled { success: bool, order: Order, message: &'static str }

impl From<Placed> for Settled {
    fn from(placed: Placed) -> Self { Self { success: true, order: placed.order, message: "Payment successful and order placed" } }
}

async fn verify(State(state): State<AppState>, CurrentUser(user): CurrentUser, ValidJson(req): ValidJson<VerifyRequest>) -> Result<Json<Settled>> {
    let proof = SettlementProof::Signature { order_id: req.razorpay_order_id, payment_id: req.razorpay_payment_id, signature: req.razorpay_signature };
    let placed = state.workflow.settle_payment(&user, SettlePayment { proof, lines: req.products, shipping_address: req.shipping_address }).await?;
    Ok(Json(placed.into()))
}

async fn capture_order(State(state): State<AppState>, CurrentUser(user): CurrentUser, ValidJson(req): ValidJson<CaptureRequest>) -> Result<Json<Settled>> {
    let proof = SettlementProof::Capture { order_id: req.order_id };
    let placed = state.workflow.settle_payment(&user, SettlePayment { proof, lines: req.products, shipping_address: req.shipping_address }).await?;
    Ok(Json(placed.into()))
}
