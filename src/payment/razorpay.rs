//! Razorpay: orders API for intents, HMAC signature check for settlement.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{read_json, GatewayError, GatewayIntent, GatewayProvider, PaymentGateway, PaymentQuote, Settlement, SettlementProof};
use crate::config::RazorpayCredentials;
use crate::domain::Money;

const API_BASE: &str = "https://api.razorpay.com/v1";

type HmacSha256 = Hmac<Sha256>;

pub struct Razorpay { http: reqwest::Client, creds: RazorpayCredentials }

#[derive(Serialize)]
struct CreateOrder<'a> { amount: i64, currency: &'a str, receipt: &'a str, notes: Notes }

#[derive(Serialize)]
struct Notes { #[serde(rename = "userId")] user_id: String }

#[derive(Deserialize)]
struct RemoteOrder { id: String, amount: i64, currency: String }

impl Razorpay {
    pub fn new(http: reqwest::Client, creds: RazorpayCredentials) -> Self { Self { http, creds } }
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`, as Razorpay signs a checkout.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    let mac = mac_for(secret, order_id, payment_id).ok()?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison against the recomputed signature.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else { return false };
    let Ok(mac) = mac_for(secret, order_id, payment_id) else { return false };
    mac.verify_slice(&expected).is_ok()
}

fn mac_for(secret: &str, order_id: &str, payment_id: &str) -> Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

#[async_trait]
impl PaymentGateway for Razorpay {
    fn provider(&self) -> GatewayProvider { GatewayProvider::Razorpay }

    async fn create_intent(&self, quote: &PaymentQuote) -> Result<GatewayIntent, GatewayError> {
        let amount = Money::new(quote.total, &quote.currency).minor_units().map_err(|e| GatewayError::Protocol(e.to_string()))?;
        let body = CreateOrder { amount, currency: &quote.currency, receipt: &quote.receipt, notes: Notes { user_id: quote.user_id.to_string() } };
        let response = self.http.post(format!("{API_BASE}/orders"))
            .basic_auth(&self.creds.key_id, Some(&self.creds.key_secret))
            .json(&body)
            .send().await?;
        let order: RemoteOrder = read_json(response).await?;
        tracing::info!(gateway_order = %order.id, amount = order.amount, "razorpay order created");
        Ok(GatewayIntent {
            provider: GatewayProvider::Razorpay, gateway_order_id: order.id, amount: order.amount, currency: order.currency,
            client_key: Some(self.creds.key_id.clone()), approval_url: None,
        })
    }

    async fn settle(&self, proof: &SettlementProof) -> Result<Settlement, GatewayError> {
        let SettlementProof::Signature { order_id, payment_id, signature } = proof else {
            return Err(GatewayError::UnsupportedProof { provider: GatewayProvider::Razorpay, proof: "capture" });
        };
        if !verify_signature(&self.creds.key_secret, order_id, payment_id, signature) {
            tracing::warn!(gateway_order = %order_id, "razorpay signature mismatch");
            return Err(GatewayError::VerificationFailed);
        }
        Ok(Settlement { gateway_order_id: order_id.clone(), gateway_payment_id: payment_id.clone() })
    }
}
