use super::client::{Endpoints, OAuthClient};
use super::{ExternalIdentity, IdentityProvider, OAuthProvider, ProviderToken};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const ENDPOINTS: Endpoints = Endpoints {
    redirect_url: "http://localhost:8080/api/auth/yandex/callback",
    auth_url: "https://oauth.yandex.com/authorize",
    token_url: "https://oauth.yandex.com/token",
    userinfo_url: "https://login.yandex.ru/info?format=json",
    scopes: &["login:email"],
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YandexUserInfo {
    pub id: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub default_email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub default_avatar_id: String,
}

impl YandexUserInfo {
    pub fn into_identity(self) -> Result<ExternalIdentity, ProviderError> {
        let email = if self.default_email.is_empty() {
            self.emails.into_iter().find(|e| !e.is_empty())
        } else {
            Some(self.default_email)
        }
        .ok_or(ProviderError::MissingEmail {
            provider: OAuthProvider::Yandex,
        })?;

        let name = if self.real_name.is_empty() {
            [self.first_name, self.last_name]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            self.real_name
        };

        let avatar_url = (!self.default_avatar_id.is_empty()).then(|| {
            format!(
                "https://avatars.yandex.net/get-yapic/{}/islands-middle",
                self.default_avatar_id
            )
        });

        Ok(ExternalIdentity {
            email,
            name: Some(name).filter(|n| !n.is_empty()),
            avatar_url,
            external_id: self.id,
            provider: OAuthProvider::Yandex,
        })
    }
}

pub struct YandexProvider {
    client: OAuthClient,
}

impl YandexProvider {
    pub fn new(config: &ProviderConfig, http: reqwest::Client) -> Self {
        Self {
            client: OAuthClient::new(OAuthProvider::Yandex, config, ENDPOINTS, http),
        }
    }
}

#[async_trait]
impl IdentityProvider for YandexProvider {
    fn kind(&self) -> OAuthProvider {
        OAuthProvider::Yandex
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
            .fetch_user_info::<YandexUserInfo>(token)
            .await?
            .into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_first_listed_email() {
        let info = YandexUserInfo {
            id: "42".into(),
            emails: vec!["first@yandex.ru".into(), "second@yandex.ru".into()],
            ..Default::default()
        };
        assert_eq!(info.into_identity().unwrap().email, "first@yandex.ru");
    }

    #[test]
    fn no_email_at_all_is_rejected() {
        let info = YandexUserInfo {
            id: "42".into(),
            ..Default::default()
        };
        assert!(matches!(
            info.into_identity(),
            Err(ProviderError::MissingEmail { .. })
        ));
    }

    #[test]
    fn display_name_prefers_real_name() {
        let info = YandexUserInfo {
            id: "42".into(),
            default_email: "y@yandex.ru".into(),
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            real_name: "Ivan P.".into(),
            ..Default::default()
        };
        assert_eq!(info.into_identity().unwrap().name.as_deref(), Some("Ivan P."));
    }

    #[test]
    fn display_name_joins_first_and_last() {
        let base = YandexUserInfo {
            id: "42".into(),
            default_email: "y@yandex.ru".into(),
            ..Default::default()
        };

        let both = YandexUserInfo {
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            ..base.clone()
        };
        assert_eq!(both.into_identity().unwrap().name.as_deref(), Some("Ivan Petrov"));

        let last_only = YandexUserInfo {
            last_name: "Petrov".into(),
            ..base.clone()
        };
        assert_eq!(last_only.into_identity().unwrap().name.as_deref(), Some("Petrov"));

        assert_eq!(base.into_identity().unwrap().name, None);
    }

    #[test]
    fn avatar_only_when_id_present() {
        let with_avatar = YandexUserInfo {
            id: "42".into(),
            default_email: "y@yandex.ru".into(),
            default_avatar_id: "1234/abcd".into(),
            ..Default::default()
        };
        assert_eq!(
            with_avatar.into_identity().unwrap().avatar_url.as_deref(),
            Some("https://avatars.yandex.net/get-yapic/1234/abcd/islands-middle")
        );

        let without = YandexUserInfo {
            id: "42".into(),
            default_email: "y@yandex.ru".into(),
            ..Default::default()
        };
        assert_eq!(without.into_identity().unwrap().avatar_url, None);
    }
}
