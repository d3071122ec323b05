//! Payment gateway adapters.
//!
//! The order workflow talks to exactly one [`PaymentGateway`], chosen by
//! configuration at start-up. Each adapter does two things: create a remote
//! payment intent sized to a server-computed quote, and later settle it, either
//! by checking a signature ([`razorpay`]) or by capturing the approved order
//! ([`paypal`]). Adapters never touch stores; turning a settlement into an
//! order is the workflow's job.

pub mod paypal;
pub mod razorpay;

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ConfigError, PaymentConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider { Razorpay, PayPal }

impl GatewayProvider {
    pub fn as_str(&self) -> &'static str { match self { Self::Razorpay => "razorpay", Self::PayPal => "paypal" } }
}

impl fmt::Display for GatewayProvider { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }

impl FromStr for GatewayProvider {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() { "razorpay" => Ok(Self::Razorpay), "paypal" => Ok(Self::PayPal), other => Err(other.to_string()) }
    }
}

/// What the customer is about to pay for, priced from the live catalog.
#[derive(Clone, Debug)]
pub struct PaymentQuote {
    pub user_id: Uuid,
    pub currency: String,
    pub total: Decimal,
    pub lines: Vec<QuotedLine>,
    pub receipt: String,
}

#[derive(Clone, Debug)]
pub struct QuotedLine { pub name: String, pub unit_price: Decimal, pub quantity: u32 }

/// Provider-side pending payment handed back to the client.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayIntent {
    pub provider: GatewayProvider,
    #[serde(rename = "orderId")]
    pub gateway_order_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "key", skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
}

/// What the client returns once it has paid out-of-band.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementProof {
    Signature { order_id: String, payment_id: String, signature: String },
    Capture { order_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement { pub gateway_order_id: String, pub gateway_payment_id: String }

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment signature does not match")]
    VerificationFailed,

    #[error("payment not completed (status {0})")]
    NotCompleted(String),

    #[error("{provider} cannot settle a {proof} proof")]
    UnsupportedProof { provider: GatewayProvider, proof: &'static str },

    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> GatewayProvider;
    async fn create_intent(&self, quote: &PaymentQuote) -> Result<GatewayIntent, GatewayError>;
    async fn settle(&self, proof: &SettlementProof) -> Result<Settlement, GatewayError>;
}

/// Builds the configured adapter; `None` means only cash on delivery is offered.
pub fn from_config(config: &PaymentConfig, http: reqwest::Client) -> Result<Option<Arc<dyn PaymentGateway>>, ConfigError> {
    let Some(provider) = config.provider else { return Ok(None) };
    let gateway: Arc<dyn PaymentGateway> = match provider {
        GatewayProvider::Razorpay => {
            let creds = config.razorpay.clone().ok_or(ConfigError::Missing("RAZORPAY_KEY_ID/RAZORPAY_KEY_SECRET"))?;
            Arc::new(razorpay::Razorpay::new(http, creds))
        }
        GatewayProvider::PayPal => {
            let creds = config.paypal.clone().ok_or(ConfigError::Missing("PAYPAL_CLIENT_ID/PAYPAL_CLIENT_SECRET"))?;
            Arc::new(paypal::PayPal::new(http, creds))
        }
    };
    tracing::info!(provider = %provider, "payment gateway configured");
    Ok(Some(gateway))
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Rejected { status: status.as_u16(), body });
    }
    Ok(response.json::<T>().await?)
}
