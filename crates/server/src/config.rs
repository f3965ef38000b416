use serde::Deserialize;
use thiserror::Error;

/// Lifetime of an issued session token when the config does not override it.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Longest session lifetime the config accepts: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Minimum accepted length of the HMAC signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Client registration for one external OAuth provider.
///
/// Endpoint URLs are optional; each provider adapter falls back to the
/// provider's public endpoints when they are absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub redirect_url: Option<String>,
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub userinfo_url: Option<String>,
}

impl ProviderConfig {
    /// A provider is usable only when both halves of the client credential are set.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub google: ProviderConfig,
    #[serde(default)]
    pub yandex: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Where the OAuth callback sends the browser once a session token exists.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

impl AppConfig {
    pub fn token_ttl(&self) -> time::Duration {
        time::Duration::seconds(self.token_ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Validation(format!(
                "jwt_secret must be at least {MIN_JWT_SECRET_LEN} bytes"
            )));
        }
        if self.token_ttl_secs <= 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Validation(format!(
                "token_ttl_secs must be in 1..={MAX_TOKEN_TTL_SECS}"
            )));
        }
        if url::Url::parse(&self.frontend_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "frontend_url is not a valid URL: {}",
                self.frontend_url
            )));
        }
        Ok(())
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_token_ttl_secs() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

/// Load application configuration from `config.yaml` (optional) + environment overrides.
///
/// Any variable matching the key path separated by double underscores overrides
/// the file value, e.g. `JWT_SECRET` or `OAUTH__GOOGLE__CLIENT_ID`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from("config.yaml")
}

/// Same as [`load_config`] but reading the given file path.
pub fn load_config_from(path: &str) -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            listen_addr: default_listen_addr(),
            frontend_url: default_frontend_url(),
            jwt_secret: "0123456789abcdef0123456789abcdef".into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            oauth: OAuthConfig::default(),
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_short_secret() {
        let mut config = base_config();
        config.jwt_secret = "too-short".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_ttl() {
        let mut config = base_config();
        config.token_ttl_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_oversized_ttl() {
        let mut config = base_config();
        config.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        assert!(config.validate().is_ok());
        config.token_ttl_secs = i64::MAX / 2;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn provider_needs_both_credentials() {
        let mut provider = ProviderConfig {
            client_id: "id".into(),
            ..Default::default()
        };
        assert!(!provider.is_configured());
        provider.client_secret = "secret".into();
        assert!(provider.is_configured());
    }
}
