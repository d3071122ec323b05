//! Customer notifications (SMS + email).
//!
//! Delivery is best effort: the order is already persisted when a notifier
//! runs, so every failure is logged and folded into a [`DeliveryReport`]
//! instead of being returned to the caller.

pub mod smtp;
pub mod templates;
pub mod twilio;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{SmtpConfig, TwilioConfig};
use crate::domain::{Order, PhoneNumber};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("sms request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sms provider rejected message (code {code:?}): {message}")]
    Rejected { code: Option<i64>, message: String },

    #[error("invalid address {0}")]
    InvalidAddress(String),

    #[error("email could not be built: {0}")]
    Message(String),

    #[error("smtp error: {0}")]
    Smtp(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage { pub to: String, pub subject: String, pub html: String }

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Returns the provider's message id.
    async fn send_sms(&self, to: &PhoneNumber, body: &str) -> Result<String, NotifyError>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Who a customer notification goes to.
#[derive(Clone, Debug)]
pub struct CustomerContact { pub name: String, pub phone: Option<PhoneNumber>, pub email: Option<String> }

/// What actually went out for one order event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport { pub sms: bool, pub email: bool }

#[derive(Clone, Default)]
pub struct Notifier {
    sms: Option<Arc<dyn SmsSender>>,
    email: Option<Arc<dyn EmailSender>>,
}

impl Notifier {
    pub fn new(sms: Option<Arc<dyn SmsSender>>, email: Option<Arc<dyn EmailSender>>) -> Self { Self { sms, email } }

    pub fn disabled() -> Self { Self::default() }

    /// Channels without credentials stay off.
    pub fn from_config(sms: Option<&TwilioConfig>, email: Option<&SmtpConfig>, http: reqwest::Client) -> Result<Self, NotifyError> {
        let sms: Option<Arc<dyn SmsSender>> = sms.map(|c| Arc::new(twilio::Twilio::new(http, c.clone())) as Arc<dyn SmsSender>);
        let email: Option<Arc<dyn EmailSender>> = match email {
            Some(c) => Some(Arc::new(smtp::Smtp::new(c)?)),
            None => None,
        };
        if sms.is_none() { tracing::warn!("twilio credentials not configured, sms disabled"); }
        if email.is_none() { tracing::warn!("smtp credentials not configured, email disabled"); }
        Ok(Self { sms, email })
    }

    pub fn order_placed(&self, order: &Order, contact: CustomerContact) -> JoinHandle<DeliveryReport> {
        let sms = contact.phone.as_ref().map(|p| (p.clone(), templates::order_placed_sms(&contact.name, order)));
        let email = contact.email.as_ref().map(|to| EmailMessage {
            to: to.clone(),
            subject: "Order Confirmation - ShopEase".to_string(),
            html: templates::order_placed_email(&contact.name, order),
        });
        self.dispatch(order.id, "order_placed", sms, email)
    }

    pub fn status_changed(&self, order: &Order, contact: CustomerContact) -> JoinHandle<DeliveryReport> {
        let sms = contact.phone.as_ref().map(|p| (p.clone(), templates::status_sms(&contact.name, order)));
        let email = contact.email.as_ref().map(|to| EmailMessage {
            to: to.clone(),
            subject: templates::status_subject(order.status),
            html: templates::status_email(&contact.name, order),
        });
        self.dispatch(order.id, "order_status_changed", sms, email)
    }

    fn dispatch(&self, order_id: Uuid, event: &'static str, sms: Option<(PhoneNumber, String)>, email: Option<EmailMessage>) -> JoinHandle<DeliveryReport> {
        let (sms_sender, email_sender) = (self.sms.clone(), self.email.clone());
        tokio::spawn(async move {
            let mut report = DeliveryReport::default();
            match (sms_sender, sms) {
                (Some(sender), Some((to, body))) => match sender.send_sms(&to, &body).await {
                    Ok(sid) => { tracing::info!(%order_id, event, sid = %sid, "sms sent"); report.sms = true; }
                    Err(e) => tracing::error!(%order_id, event, to = %to, error = %e, "sms failed"),
                },
                (None, Some(_)) => tracing::debug!(%order_id, event, "sms disabled, skipping"),
                (_, None) => tracing::warn!(%order_id, event, "no phone number for order"),
            }
            match (email_sender, email) {
                (Some(sender), Some(message)) => match sender.send_email(&message).await {
                    Ok(()) => { tracing::info!(%order_id, event, to = %message.to, "email sent"); report.email = true; }
                    Err(e) => tracing::error!(%order_id, event, to = %message.to, error = %e, "email failed"),
                },
                (None, Some(_)) => tracing::debug!(%order_id, event, "email disabled, skipping"),
                (_, None) => tracing::warn!(%order_id, event, "no email address for customer"),
            }
            report
        })
    }
}
