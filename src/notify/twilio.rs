//! Twilio Programmable Messaging over its REST API.

use async_trait::async_trait;
use serde::Deserialize;

use super::{NotifyError, SmsSender};
use crate::config::TwilioConfig;
use crate::domain::PhoneNumber;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct Twilio { http: reqwest::Client, config: TwilioConfig }

#[derive(Deserialize)]
struct MessageResource { sid: String, #[serde(default)] status: Option<String> }

#[derive(Deserialize)]
struct ApiError { #[serde(default)] code: Option<i64>, #[serde(default)] message: Option<String> }

impl Twilio {
    pub fn new(http: reqwest::Client, config: TwilioConfig) -> Self { Self { http, config } }
}

/// Operator hint for the error codes a misconfigured account hits most.
fn hint(code: i64) -> Option<&'static str> {
    match code {
        21608 => Some("trial account: recipient number is not verified"),
        21211 => Some("recipient phone number is invalid"),
        21408 => Some("sending number is not owned by this account"),
        _ => None,
    }
}

#[async_trait]
impl SmsSender for Twilio {
    async fn send_sms(&self, to: &PhoneNumber, body: &str) -> Result<String, NotifyError> {
        let url = format!("{API_BASE}/Accounts/{}/Messages.json", self.config.account_sid);
        let response = self.http.post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", to.as_str()), ("From", self.config.from_number.as_str()), ("Body", body)])
            .send().await?;
        let status = response.status();
        if !status.is_success() {
            let err: ApiError = response.json().await.unwrap_or(ApiError { code: None, message: None });
            if let Some(h) = err.code.and_then(hint) {
                tracing::warn!(code = err.code, to = %to, "twilio: {h}");
            }
            return Err(NotifyError::Rejected { code: err.code, message: err.message.unwrap_or_else(|| status.to_string()) });
        }
        let message: MessageResource = response.json().await?;
        tracing::debug!(sid = %message.sid, status = message.status.as_deref().unwrap_or("unknown"), "twilio accepted message");
        Ok(message.sid)
    }
}
