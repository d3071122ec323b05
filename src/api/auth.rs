use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{AppState, CurrentUser, ValidJson};
use crate::auth::{hash_password, verify_password};
use crate::domain::{Email, Role, User};
use crate::store::StoreError;
use crate::{Result, ShopError};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() { Err(ValidationError::new("blank")) } else { Ok(()) }
}

fn email_shape(value: &str) -> std::result::Result<(), ValidationError> {
    Email::parse(value).map(|_| ()).ok_or_else(|| ValidationError::new("email"))
}

fn already_exists() -> ShopError { ShopError::Validation("User already exists".to_string()) }

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct RegisterRequest {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    name: String,
    #[validate(custom(function = "email_shape", message = "Please enter a valid email"))]
    email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct LoginRequest {
    #[validate(custom(function = "email_shape", message = "Please enter a valid email"))]
    email: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    password: String,
}

#[derive(Serialize)]
struct Session { token: String, user: User }

async fn register(State(state): State<AppState>, ValidJson(req): ValidJson<RegisterRequest>) -> Result<(StatusCode, Json<Session>)> {
    let email = Email::parse(&req.email).ok_or_else(|| ShopError::Validation("Please enter a valid email".to_string()))?;
    if state.stores.users.user_by_email(email.as_str()).await?.is_some() { return Err(already_exists()); }

    let user = User::new(req.name, email, hash_password(&req.password).await?, Role::Customer);
    state.stores.users.insert_user(&user).await.map_err(|e| match e {
        StoreError::Conflict(_) => already_exists(),
        other => other.into(),
    })?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(Session { token: state.tokens.issue(user.id), user })))
}

async fn login(State(state): State<AppState>, ValidJson(req): ValidJson<LoginRequest>) -> Result<Json<Session>> {
    let invalid = || ShopError::Unauthenticated("Invalid credentials".to_string());
    let email = Email::parse(&req.email).ok_or_else(invalid)?;
    let user = state.stores.users.user_by_email(email.as_str()).await?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash).await? {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }
    Ok(Json(Session { token: state.tokens.issue(user.id), user }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> { Json(user) }
