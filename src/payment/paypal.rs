//! PayPal Orders v2: create an order for approval, capture it on return.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{read_json, GatewayError, GatewayIntent, GatewayProvider, PaymentGateway, PaymentQuote, Settlement, SettlementProof};
use crate::config::PayPalCredentials;
use crate::domain::Money;

pub struct PayPal { http: reqwest::Client, creds: PayPalCredentials }

#[derive(Deserialize)]
struct AccessToken { access_token: String }

#[derive(Deserialize)]
struct CreatedOrder { id: String, #[serde(default)] links: Vec<Link> }

#[derive(Deserialize)]
struct Link { href: String, rel: String }

#[derive(Deserialize)]
pub(crate) struct CaptureResponse {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<CapturedUnit>,
}

#[derive(Deserialize)]
struct CapturedUnit { #[serde(default)] payments: Option<CapturedPayments> }

#[derive(Deserialize)]
struct CapturedPayments { #[serde(default)] captures: Vec<Capture> }

#[derive(Deserialize)]
struct Capture { id: String }

#[derive(Serialize)]
struct Amount { currency_code: String, value: String }

fn amount(currency: &str, value: Decimal) -> Amount {
    Amount { currency_code: currency.to_string(), value: format!("{:.2}", value.round_dp(2)) }
}

impl PayPal {
    pub fn new(http: reqwest::Client, creds: PayPalCredentials) -> Self { Self { http, creds } }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let response = self.http.post(format!("{}/v1/oauth2/token", self.creds.api_base()))
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send().await?;
        Ok(read_json::<AccessToken>(response).await?.access_token)
    }

    fn order_body(&self, quote: &PaymentQuote) -> Result<serde_json::Value, GatewayError> {
        let items: Vec<_> = quote.lines.iter().map(|l| json!({
            "name": l.name,
            "quantity": l.quantity.to_string(),
            "unit_amount": amount(&quote.currency, l.unit_price),
        })).collect();
        let item_total = quote.lines.iter()
            .try_fold(Decimal::ZERO, |acc, l| l.unit_price.round_dp(2).checked_mul(Decimal::from(l.quantity)).and_then(|line| acc.checked_add(line)))
            .ok_or_else(|| GatewayError::Protocol("paypal item total overflows".to_string()))?;
        Ok(json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": quote.receipt,
                "custom_id": quote.user_id.to_string(),
                "amount": {
                    "currency_code": quote.currency,
                    "value": format!("{:.2}", item_total),
                    "breakdown": { "item_total": amount(&quote.currency, item_total) },
                },
                "items": items,
            }],
            "application_context": {
                "brand_name": "ShopEase",
                "user_action": "PAY_NOW",
                "return_url": self.creds.return_url,
                "cancel_url": self.creds.cancel_url,
            },
        }))
    }
}

/// Capture id of the first capture, falling back to the order id.
pub(crate) fn settlement_from_capture(capture: CaptureResponse) -> Result<Settlement, GatewayError> {
    if capture.status != "COMPLETED" { return Err(GatewayError::NotCompleted(capture.status)); }
    let payment_id = capture.purchase_units.into_iter()
        .filter_map(|u| u.payments)
        .flat_map(|p| p.captures)
        .map(|c| c.id)
        .next()
        .unwrap_or_else(|| capture.id.clone());
    Ok(Settlement { gateway_order_id: capture.id, gateway_payment_id: payment_id })
}

/// PayPal answers a capture it refuses (unapproved, already captured) with 422 and an issue code.
pub(crate) fn capture_rejection(err: GatewayError) -> GatewayError {
    #[derive(Deserialize)]
    struct Issue { issue: String }
    #[derive(Deserialize)]
    struct Unprocessable { #[serde(default)] name: Option<String>, #[serde(default)] details: Vec<Issue> }

    match err {
        GatewayError::Rejected { status: 422, body } => {
            let parsed = serde_json::from_str::<Unprocessable>(&body).ok();
            let issue = parsed.and_then(|u| u.details.into_iter().map(|d| d.issue).next().or(u.name));
            GatewayError::NotCompleted(issue.unwrap_or_else(|| "UNPROCESSABLE_ENTITY".to_string()))
        }
        other => other,
    }
}

#[async_trait]
impl PaymentGateway for PayPal {
    fn provider(&self) -> GatewayProvider { GatewayProvider::PayPal }

    async fn create_intent(&self, quote: &PaymentQuote) -> Result<GatewayIntent, GatewayError> {
        let token = self.access_token().await?;
        let response = self.http.post(format!("{}/v2/checkout/orders", self.creds.api_base()))
            .bearer_auth(token)
            .json(&self.order_body(quote)?)
            .send().await?;
        let order: CreatedOrder = read_json(response).await?;
        let approval_url = order.links.into_iter().find(|l| l.rel == "approve").map(|l| l.href)
            .ok_or_else(|| GatewayError::Protocol(format!("paypal order {} has no approve link", order.id)))?;
        let amount = Money::new(quote.total, &quote.currency).minor_units().map_err(|e| GatewayError::Protocol(e.to_string()))?;
        tracing::info!(gateway_order = %order.id, "paypal order created");
        Ok(GatewayIntent {
            provider: GatewayProvider::PayPal, gateway_order_id: order.id, amount, currency: quote.currency.clone(),
            client_key: None, approval_url: Some(approval_url),
        })
    }

    async fn settle(&self, proof: &SettlementProof) -> Result<Settlement, GatewayError> {
        let SettlementProof::Capture { order_id } = proof else {
            return Err(GatewayError::UnsupportedProof { provider: GatewayProvider::PayPal, proof: "signature" });
        };
        let token = self.access_token().await?;
        let response = self.http.post(format!("{}/v2/checkout/orders/{order_id}/capture", self.creds.api_base()))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send().await?;
        let capture: CaptureResponse = read_json(response).await.map_err(capture_rejection)?;
        tracing::info!(gateway_order = %order_id, status = %capture.status, "paypal capture returned");
        settlement_from_capture(capture)
    }
}
