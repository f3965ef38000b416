use super::{OAuthProvider, ProviderToken};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

/// Endpoints and credentials of one OAuth client registration.
#[derive(Clone)]
pub(crate) struct OAuthClient {
    provider: OAuthProvider,
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    scopes: &'static [&'static str],
}

pub(crate) struct Endpoints {
    pub redirect_url: &'static str,
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub userinfo_url: &'static str,
    pub scopes: &'static [&'static str],
}

impl OAuthClient {
    pub(crate) fn new(
        provider: OAuthProvider,
        config: &ProviderConfig,
        defaults: Endpoints,
        http: reqwest::Client,
    ) -> Self {
        let or_default =
            |value: &Option<String>, default: &str| value.clone().unwrap_or_else(|| default.into());
        Self {
            provider,
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: or_default(&config.redirect_url, defaults.redirect_url),
            auth_url: or_default(&config.auth_url, defaults.auth_url),
            token_url: or_default(&config.token_url, defaults.token_url),
            userinfo_url: or_default(&config.userinfo_url, defaults.userinfo_url),
            scopes: defaults.scopes,
        }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ProviderError::Configuration {
                provider: self.provider,
                reason: "client id and secret must both be set".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn authorization_url(&self, state: &str) -> Result<Url, ProviderError> {
        self.ensure_configured()?;
        let scope = self.scopes.join(" ");
        Url::parse_with_params(
            &self.auth_url,
            &[
                ("access_type", "offline"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| ProviderError::Configuration {
            provider: self.provider,
            reason: format!("invalid auth url {}: {e}", self.auth_url),
        })
    }

    #[tracing::instrument(skip(self, code), fields(provider = %self.provider))]
    pub(crate) async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        self.ensure_configured()?;
        let exchange_err = |reason: String| ProviderError::Exchange {
            provider: self.provider,
            reason,
        };

        let response = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| exchange_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(exchange_err(format!("token endpoint returned {status}: {body}")));
        }

        response
            .json::<ProviderToken>()
            .await
            .map_err(|e| exchange_err(format!("unreadable token response: {e}")))
    }

    #[tracing::instrument(skip(self, token), fields(provider = %self.provider))]
    pub(crate) async fn fetch_user_info<T: DeserializeOwned>(
        &self,
        token: &ProviderToken,
    ) -> Result<T, ProviderError> {
        let user_info_err = |reason: String| ProviderError::UserInfo {
            provider: self.provider,
            reason,
        };

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| user_info_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(user_info_err(format!("user info endpoint returned {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| user_info_err(format!("unreadable user info: {e}")))
    }
}
