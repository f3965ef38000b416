//! Account records and the identity vocabulary shared by every layer.
//!
//! An account is always in one of three shapes:
//!
//! - **guest**: no email, no provider, no external id
//! - **local**: email + password hash, provider `local` (a linked local account
//!   additionally carries an OAuth provider and external id)
//! - **OAuth**: email, no password, provider + external id
//!
//! Guest promotion flips a guest into an OAuth account in place, keeping its id.

use crate::error::UnsupportedProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Account role. Anything outside the three known values is kept as
/// `Unrecognized` so authorization gates can reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Guest,
    #[serde(other)]
    Unrecognized,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Guest => "guest",
            Role::Unrecognized => "unrecognized",
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "user" => Role::User,
            "admin" => Role::Admin,
            "guest" => Role::Guest,
            _ => Role::Unrecognized,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which authority vouches for an account's email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
    Yandex,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
            AuthProvider::Yandex => "yandex",
        }
    }
}

impl FromStr for AuthProvider {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            "yandex" => Ok(AuthProvider::Yandex),
            other => Err(UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Account {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AuthProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_login_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Account {
    pub fn is_guest(&self) -> bool {
        self.role == Role::Guest
    }

    /// Provider tag is `local`. Linking an OAuth identity replaces the tag.
    pub fn is_local(&self) -> bool {
        self.provider == Some(AuthProvider::Local)
    }
}

/// Insert payload for local and guest accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub provider: Option<AuthProvider>,
    pub role: Role,
}

impl NewAccount {
    pub fn local(email: String, password_hash: String) -> Self {
        Self {
            email: Some(email),
            password_hash: Some(password_hash),
            provider: Some(AuthProvider::Local),
            role: Role::User,
        }
    }

    pub fn guest() -> Self {
        Self {
            email: None,
            password_hash: None,
            provider: None,
            role: Role::Guest,
        }
    }
}

/// Insert payload for an account first seen through an OAuth provider.
/// The password and avatar are never set.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOAuthAccount {
    pub email: String,
    pub name: Option<String>,
    pub provider: AuthProvider,
    pub external_id: String,
}

/// Full replacement of an account's identity fields.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: Option<AuthProvider>,
    pub external_id: Option<String>,
    pub role: Role,
}

/// The track an account was last listening to, as recorded by the player.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LastTrack {
    pub track_id: String,
    pub position_secs: f64,
}

/// Lower-cases and trims an email so lookups and unique constraints agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
