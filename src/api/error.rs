//! HTTP mapping for `ShopError` and the validating JSON extractor.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::Validate;

use crate::ShopError;

/// Carried on 5xx responses so [`expose_detail`] can decide whether the client sees it.
#[derive(Clone, Debug)]
pub(crate) struct ErrorDetail { message: &'static str, detail: String }

/// Response middleware: in development mode, rewrites 5xx bodies to include the error chain.
pub(crate) async fn expose_detail(State(development): State<bool>, response: Response) -> Response {
    if !development { return response; }
    let Some(ErrorDetail { message, detail }) = response.extensions().get::<ErrorDetail>().cloned() else { return response };
    (response.status(), Json(json!({ "message": message, "error": detail }))).into_response()
}

impl ShopError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InsufficientStock { .. }
            | Self::PaymentVerificationFailed
            | Self::PaymentNotCompleted { .. }
            | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Gateway(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !status.is_server_error() {
            return (status, Json(json!({ "message": self.to_string() }))).into_response();
        }
        tracing::error!(error = %self, "request failed");
        let message = match &self {
            Self::Gateway(_) => "Payment gateway error",
            _ => "Server error",
        };
        let mut response = (status, Json(json!({ "message": message }))).into_response();
        response.extensions_mut().insert(ErrorDetail { message, detail: self.to_string() });
        response
    }
}

/// `Json<T>` that also runs `validator` rules, reporting both failure kinds as 400s.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e: JsonRejection| ShopError::Validation(e.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    async fn failing_body(development: bool) -> serde_json::Value {
        let app = Router::new()
            .route("/boom", get(|| async { Err::<(), _>(ShopError::Internal("pool timed out".into())) }))
            .route("/missing", get(|| async { Err::<(), _>(ShopError::NotFound("Order not found".into())) }))
            .layer(middleware::map_response_with_state(development, expose_detail));
        let resp = app.clone().oneshot(axum::http::Request::builder().uri("/boom").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let missing = app.oneshot(axum::http::Request::builder().uri("/missing").body(Body::empty()).unwrap()).await.unwrap();
        let missing: serde_json::Value = serde_json::from_slice(&axum::body::to_bytes(missing.into_body(), 1024).await.unwrap()).unwrap();
        assert_eq!(missing, json!({ "message": "Order not found" }));
        serde_json::from_slice(&axum::body::to_bytes(resp.into_body(), 1024).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_error_detail_follows_router_mode() {
        assert_eq!(failing_body(false).await, json!({ "message": "Server error" }));
        assert_eq!(failing_body(true).await, json!({ "message": "Server error", "error": "pool timed out" }));
        // Two routers in one process keep their own mode.
        assert_eq!(failing_body(false).await, json!({ "message": "Server error" }));
    }

    #[tokio::test]
    async fn test_status_mapping_and_body() {
        let resp = ShopError::InsufficientStock { product: "Toor Dal".into() }.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Insufficient stock for Toor Dal");

        assert_eq!(ShopError::admin_only().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ShopError::Unauthenticated("No token".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ShopError::NotFound("Order not found".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ShopError::Internal("boom".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
