//! SMTP delivery through lettre's tokio transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{EmailMessage, EmailSender, NotifyError};
use crate::config::SmtpConfig;

pub struct Smtp { transport: AsyncSmtpTransport<Tokio1Executor>, from: Mailbox }

impl Smtp {
    /// Port 465 speaks implicit TLS, every other port upgrades with STARTTLS.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .timeout(Some(Duration::from_secs(10)))
            .build();
        let from = config.from.parse::<Mailbox>().map_err(|_| NotifyError::InvalidAddress(config.from.clone()))?;
        Ok(Self { transport, from })
    }
}

pub(crate) fn build_message(from: &Mailbox, message: &EmailMessage) -> Result<Message, NotifyError> {
    let to = message.to.parse::<Mailbox>().map_err(|_| NotifyError::InvalidAddress(message.to.clone()))?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(message.html.clone())
        .map_err(|e| NotifyError::Message(e.to_string()))
}

#[async_trait]
impl EmailSender for Smtp {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let email = build_message(&self.from, message)?;
        let response = self.transport.send(email).await.map_err(|e| NotifyError::Smtp(e.to_string()))?;
        tracing::debug!(code = %response.code(), "smtp accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message() {
        let from: Mailbox = "ShopEase <shop@example.com>".parse().unwrap();
        let ok = EmailMessage { to: "asha@example.com".into(), subject: "Order Confirmation - ShopEase".into(), html: "<p>hi</p>".into() };
        let formatted = String::from_utf8(build_message(&from, &ok).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Subject: Order Confirmation - ShopEase"));
        assert!(formatted.contains("text/html"));

        let bad = EmailMessage { to: "not an address".into(), ..ok };
        assert!(matches!(build_message(&from, &bad), Err(NotifyError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_transport_builds_without_connecting() {
        let config = SmtpConfig { host: "smtp.example.com".into(), port: 587, username: "u".into(), password: "p".into(), from: "ShopEase <shop@example.com>".into() };
        assert!(Smtp::new(&config).is_ok());
        let bad_from = SmtpConfig { from: "nobody".into(), ..config };
        assert!(matches!(Smtp::new(&bad_from), Err(NotifyError::InvalidAddress(_))));
    }
}
