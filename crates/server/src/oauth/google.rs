use super::client::{Endpoints, OAuthClient};
use super::{ExternalIdentity, IdentityProvider, OAuthProvider, ProviderToken};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const ENDPOINTS: Endpoints = Endpoints {
    redirect_url: "http://localhost:8080/api/auth/google/callback",
    auth_url: "https://accounts.google.com/o/oauth2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo",
    scopes: &[
        "https://www.googleapis.com/auth/userinfo.email",
        "https://www.googleapis.com/auth/userinfo.profile",
    ],
};

/// Response of the Google v2 user info endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
}

impl GoogleUserInfo {
    pub fn into_identity(self) -> Result<ExternalIdentity, ProviderError> {
        let provider = OAuthProvider::Google;
        if !self.verified_email {
            return Err(ProviderError::UnverifiedEmail { provider });
        }
        if self.email.trim().is_empty() {
            return Err(ProviderError::MissingEmail { provider });
        }
        Ok(ExternalIdentity {
            email: self.email,
            name: Some(self.name).filter(|n| !n.is_empty()),
            avatar_url: Some(self.picture).filter(|p| !p.is_empty()),
            external_id: self.id,
            provider,
        })
    }
}

pub struct GoogleProvider {
    client: OAuthClient,
}

impl GoogleProvider {
    pub fn new(config: &ProviderConfig, http: reqwest::Client) -> Self {
        Self {
            client: OAuthClient::new(OAuthProvider::Google, config, ENDPOINTS, http),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn kind(&self) -> OAuthProvider {
        OAuthProvider::Google
    }

    fn authorization_url(&self, state: &str) -> Result<Url, ProviderError> {
        self.client.authorization_url(state)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        self.client.exchange_code(code).await
    }

    async fn fetch_identity(
        &self,
        token: &ProviderToken,
    ) -> Result<ExternalIdentity, ProviderError> {
        self.client
            .fetch_user_info::<GoogleUserInfo>(token)
            .await?
            .into_identity()
    }
}
