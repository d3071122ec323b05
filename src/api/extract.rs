//! Caller identity from the `Authorization: Bearer` header.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::AppState;
use crate::domain::User;
use crate::ShopError;

/// Any signed-in user, reloaded from the store so role changes apply immediately.
pub struct CurrentUser(pub User);

/// A signed-in admin.
pub struct AdminUser(pub User);

fn bearer(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or_else(|| ShopError::Unauthenticated("No token, authorization denied".to_string()))?;
        let invalid = || ShopError::Unauthenticated("Token is not valid".to_string());
        let user_id = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            invalid()
        })?;
        let user = state.stores.users.user(user_id).await?.ok_or_else(invalid)?;
        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() { return Err(ShopError::admin_only()); }
        Ok(Self(user))
    }
}
