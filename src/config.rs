//! Environment configuration.
//!
//! Everything is read once at start-up. `.env` is loaded by `main` through
//! dotenvy before [`AppConfig::from_env`] runs; tests build configs from a
//! plain map with [`AppConfig::from_lookup`].

use std::{str::FromStr, time::Duration};

use thiserror::Error;

use crate::domain::TransitionPolicy;
use crate::payment::GatewayProvider;
use crate::workflow::LineMode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub sms: Option<TwilioConfig>,
    pub email: Option<SmtpConfig>,
    pub admin: Option<AdminSeed>,
    pub workflow: WorkflowSettings,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub development: bool,
    /// Empty means permissive CORS.
    pub frontend_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// `None` runs against the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Clone, Debug)]
pub struct AuthConfig { pub secret: String, pub token_ttl: chrono::Duration }

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub provider: Option<GatewayProvider>,
    pub razorpay: Option<RazorpayCredentials>,
    pub paypal: Option<PayPalCredentials>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct RazorpayCredentials { pub key_id: String, pub key_secret: String }

#[derive(Clone, Debug)]
pub struct PayPalCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub live: bool,
    pub return_url: String,
    pub cancel_url: String,
}

impl PayPalCredentials {
    pub fn api_base(&self) -> &'static str {
        if self.live { "https://api-m.paypal.com" } else { "https://api-m.sandbox.paypal.com" }
    }
}

#[derive(Clone, Debug)]
pub struct TwilioConfig { pub account_sid: String, pub auth_token: String, pub from_number: String }

#[derive(Clone, Debug)]
pub struct SmtpConfig { pub host: String, pub port: u16, pub username: String, pub password: String, pub from: String }

#[derive(Clone, Debug)]
pub struct AdminSeed { pub email: String, pub password: String, pub name: String }

/// Knobs of the order workflow itself.
#[derive(Clone, Debug)]
pub struct WorkflowSettings { pub currency: String, pub line_mode: LineMode, pub transitions: TransitionPolicy }

impl Default for WorkflowSettings {
    fn default() -> Self { Self { currency: "INR".to_string(), line_mode: LineMode::default(), transitions: TransitionPolicy::default() } }
}

const DEV_SECRET: &str = "shopease-dev-secret";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let development = env.get("APP_ENV").map_or(true, |v| !v.eq_ignore_ascii_case("production"));
        let frontend = env.get("FRONTEND_URL");

        let server = ServerConfig {
            port: env.parse("PORT", 5000)?,
            development,
            frontend_origins: frontend.as_deref().map(|v| v.split(',').map(|o| o.trim().trim_end_matches('/').to_string()).filter(|o| !o.is_empty()).collect()).unwrap_or_default(),
        };

        let database = DatabaseConfig { url: env.get("DATABASE_URL"), max_connections: env.parse("DATABASE_MAX_CONNECTIONS", 10)? };

        let secret = match env.get("AUTH_SECRET") {
            Some(s) => s,
            None if development => DEV_SECRET.to_string(),
            None => return Err(ConfigError::Missing("AUTH_SECRET")),
        };
        let ttl_hours: i64 = env.parse("AUTH_TOKEN_TTL_HOURS", 168)?;
        if ttl_hours <= 0 { return Err(ConfigError::Invalid { key: "AUTH_TOKEN_TTL_HOURS", value: ttl_hours.to_string() }); }
        let auth = AuthConfig { secret, token_ttl: chrono::Duration::hours(ttl_hours) };

        let provider = match env.get("PAYMENT_GATEWAY").map(|v| v.to_ascii_lowercase()) {
            None => None,
            Some(v) if v == "none" => None,
            Some(v) => Some(v.parse::<GatewayProvider>().map_err(|value| ConfigError::Invalid { key: "PAYMENT_GATEWAY", value })?),
        };
        let razorpay = match (env.get("RAZORPAY_KEY_ID"), env.get("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayCredentials { key_id, key_secret }),
            _ => None,
        };
        let frontend_base = frontend.as_deref().and_then(|v| v.split(',').next()).map(|o| o.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| "http://localhost:5173".to_string());
        let paypal = match (env.get("PAYPAL_CLIENT_ID"), env.get("PAYPAL_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(PayPalCredentials {
                client_id, client_secret,
                live: match env.get("PAYPAL_MODE").as_deref() {
                    None | Some("sandbox") => false,
                    Some("live") => true,
                    Some(other) => return Err(ConfigError::Invalid { key: "PAYPAL_MODE", value: other.to_string() }),
                },
                return_url: env.get("PAYPAL_RETURN_URL").unwrap_or_else(|| format!("{frontend_base}/payment/success")),
                cancel_url: env.get("PAYPAL_CANCEL_URL").unwrap_or_else(|| format!("{frontend_base}/cart")),
            }),
            _ => None,
        };
        let payment = PaymentConfig { provider, razorpay, paypal, timeout: Duration::from_secs(env.parse("GATEWAY_TIMEOUT_SECS", 30)?) };

        let sms = match (env.get("TWILIO_ACCOUNT_SID"), env.get("TWILIO_AUTH_TOKEN"), env.get("TWILIO_PHONE_NUMBER")) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig { account_sid, auth_token, from_number }),
            _ => None,
        };

        let email = match (env.get("EMAIL_USER"), env.get("EMAIL_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpConfig {
                host: env.get("EMAIL_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port: env.parse("EMAIL_PORT", 587)?,
                from: env.get("EMAIL_FROM").unwrap_or_else(|| format!("ShopEase <{username}>")),
                username, password,
            }),
            _ => None,
        };

        let admin = match (env.get("ADMIN_EMAIL"), env.get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password, name: env.get("ADMIN_NAME").unwrap_or_else(|| "Admin".to_string()) }),
            _ => None,
        };

        let workflow = WorkflowSettings {
            currency: env.get("CURRENCY").unwrap_or_else(|| "INR".to_string()).to_uppercase(),
            line_mode: env.parse("ORDER_LINE_MODE", LineMode::default())?,
            transitions: match env.get("STATUS_TRANSITIONS").as_deref() {
                None | Some("unrestricted") => TransitionPolicy::Unrestricted,
                Some("terminal-locked") => TransitionPolicy::TerminalLocked,
                Some(other) => return Err(ConfigError::Invalid { key: "STATUS_TRANSITIONS", value: other.to_string() }),
            },
        };

        Ok(Self { server, database, auth, payment, sms, email, admin, workflow })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Trimmed value; blank counts as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        }
    }
}
