//! User accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use crate::domain::value_objects::Email;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub orders: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] Customer, Admin }

impl Role {
    pub fn as_str(&self) -> &'static str { match self { Self::Customer => "customer", Self::Admin => "admin" } }
}

impl fmt::Display for Role { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "customer" => Ok(Self::Customer), "admin" => Ok(Self::Admin), other => Err(format!("unknown role '{other}'")) }
    }
}

impl User {
    pub fn new(name: impl Into<String>, email: Email, password_hash: String, role: Role) -> Self {
        Self { id: Uuid::now_v7(), name: name.into().trim().to_string(), email: email.into_inner(), password_hash, role, orders: vec![], created_at: Utc::now() }
    }
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Owners and admins may see and cancel an order.
    pub fn can_access(&self, owner: Uuid) -> bool { self.id == owner || self.is_admin() }
}
