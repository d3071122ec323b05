//! Bearer tokens, password hashing and the admin bootstrap.
//!
//! Tokens are `"{user_id}.{expiry_unix}.{hex hmac}"`, signed with HMAC-SHA256
//! over the first two segments. They carry no role: the role is read from the
//! user store on every request, so demoting an admin takes effect at once.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AdminSeed;
use crate::domain::{Email, Role, User};
use crate::store::{StoreError, UserStore};

type HmacSha256 = Hmac<Sha256>;

pub const BCRYPT_COST: u32 = 10;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Clone)]
pub struct TokenSigner { keyed: HmacSha256, ttl: Duration }

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self { keyed: <HmacSha256 as Mac>::new_from_slice(secret.as_ref())?, ttl })
    }

    pub fn issue(&self, user_id: Uuid) -> String { self.issue_at(user_id, Utc::now()) }

    fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> String {
        let payload = format!("{}.{}", user_id, (now + self.ttl).timestamp());
        let sig = hex::encode(self.mac(&payload).finalize().into_bytes());
        format!("{payload}.{sig}")
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> { self.verify_at(token, Utc::now()) }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        let (payload, sig) = token.trim().rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (id, expiry) = payload.split_once('.').ok_or(AuthError::Malformed)?;
        let sig = hex::decode(sig).map_err(|_| AuthError::Malformed)?;
        self.mac(payload).verify_slice(&sig).map_err(|_| AuthError::BadSignature)?;
        let expiry = expiry.parse::<i64>().ok().and_then(|t| Utc.timestamp_opt(t, 0).single()).ok_or(AuthError::Malformed)?;
        if expiry <= now { return Err(AuthError::Expired); }
        Uuid::parse_str(id).map_err(|_| AuthError::Malformed)
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(payload.as_bytes());
        mac
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// bcrypt is CPU bound, so both directions run on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_owned();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST)).await??)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("ADMIN_EMAIL {0:?} is not a valid email")]
    InvalidEmail(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Creates the configured admin, or promotes the existing account and resets its password.
pub async fn ensure_admin(users: &dyn UserStore, seed: &AdminSeed) -> Result<User, BootstrapError> {
    let email = Email::parse(&seed.email).ok_or_else(|| BootstrapError::InvalidEmail(seed.email.clone()))?;
    let hash = hash_password(&seed.password).await?;
    match users.user_by_email(email.as_str()).await? {
        Some(mut existing) => {
            let promoted = !existing.is_admin();
            existing.role = Role::Admin;
            existing.password_hash = hash;
            users.update_user(&existing).await?;
            tracing::info!(email = %existing.email, promoted, "admin account refreshed");
            Ok(existing)
        }
        None => {
            let admin = User::new(seed.name.clone(), email, hash, Role::Admin);
            users.insert_user(&admin).await?;
            tracing::info!(email = %admin.email, "admin account created");
            Ok(admin)
        }
    }
}
