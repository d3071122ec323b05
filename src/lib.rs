//! ShopEase Platform
//!
//! Grocery and department-store backend: storefront API and back office.
//!
//! ## Features
//! - Product catalog with category/search filtering
//! - Checkout with cash on delivery, Razorpay or PayPal settlement
//! - Order history, admin status workflow and soft cancellation
//! - Admin notifications and dashboard statistics
//! - Best-effort customer SMS and email

pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod notify;
pub mod payment;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use crate::auth::PasswordError;
use crate::domain::{OrderError, ProductError};
use crate::payment::GatewayError;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient stock for {product}")]
    InsufficientStock { product: String },

    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    #[error("Payment not completed (status: {status})")]
    PaymentNotCompleted { status: String },

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Payment gateway error: {0}")]
    Gateway(GatewayError),

    #[error("{0}")]
    Internal(String),
}

impl ShopError {
    pub fn admin_only() -> Self {
        Self::AccessDenied("Access denied. Admin only.".to_string())
    }
}

impl From<OrderError> for ShopError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::CannotCancel | OrderError::TransitionLocked { .. } => Self::InvalidState(e.to_string()),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<PasswordError> for ShopError {
    fn from(e: PasswordError) -> Self { Self::Internal(e.to_string()) }
}

impl From<ProductError> for ShopError {
    fn from(e: ProductError) -> Self { Self::Validation(e.to_string()) }
}

impl From<GatewayError> for ShopError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::VerificationFailed => Self::PaymentVerificationFailed,
            GatewayError::NotCompleted(status) => Self::PaymentNotCompleted { status },
            GatewayError::UnsupportedProof { .. } => Self::Validation(e.to_string()),
            other => Self::Gateway(other),
        }
    }
}

/// Distinct field messages in field-name order, joined.
impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(name, _)| *name);
        let mut messages: Vec<String> = Vec::new();
        for (name, errs) in fields {
            for e in errs {
                let message = e.message.as_ref().map_or_else(|| format!("{name} is invalid"), |m| m.to_string());
                if !messages.contains(&message) { messages.push(message); }
            }
        }
        Self::Validation(if messages.is_empty() { "Validation error".to_string() } else { messages.join(", ") })
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
