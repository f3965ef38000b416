//! External OAuth login (Google, Yandex) and identity reconciliation.
//!
//! ## Flow
//!
//! 1. `GET /api/auth/{provider}/login` redirects to the provider with an
//!    [`OAuthState`] that may carry the caller's guest id.
//! 2. The provider redirects back to `/api/auth/{provider}/callback` with a code.
//! 3. [`IdentityReconciler::handle_callback`] exchanges the code, fetches the
//!    user info and decides which account the session belongs to.

mod client;
pub mod google;
pub mod reconcile;
pub mod state;
pub mod yandex;

pub use google::GoogleProvider;
pub use reconcile::{IdentityReconciler, OAuthLogin, ReconcileOutcome};
pub use state::OAuthState;
pub use yandex::YandexProvider;

use crate::account::AuthProvider;
use crate::error::{ProviderError, UnsupportedProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use utoipa::ToSchema;

/// Providers an account can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Yandex,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Yandex => "yandex",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "yandex" => Ok(OAuthProvider::Yandex),
            other => Err(UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OAuthProvider> for AuthProvider {
    fn from(provider: OAuthProvider) -> Self {
        match provider {
            OAuthProvider::Google => AuthProvider::Google,
            OAuthProvider::Yandex => AuthProvider::Yandex,
        }
    }
}

/// Token endpoint response. Only the access token is used.
#[derive(Clone, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl ProviderToken {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: Some("Bearer".into()),
            expires_in: None,
            refresh_token: None,
        }
    }
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Provider user info, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub external_id: String,
    pub provider: OAuthProvider,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn kind(&self) -> OAuthProvider;

    /// Where to send the browser to start the login.
    fn authorization_url(&self, state: &str) -> Result<Url, ProviderError>;

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError>;

    async fn fetch_identity(&self, token: &ProviderToken)
    -> Result<ExternalIdentity, ProviderError>;
}
