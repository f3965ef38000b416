#![allow(dead_code)]

use async_trait::async_trait;
use music_identity::AppResources;
use music_identity::account::{
    Account, AuthProvider, IdentityUpdate, LastTrack, NewAccount, NewOAuthAccount,
};
use music_identity::auth::{AuthService, SessionTokenCodec};
use music_identity::config::{AppConfig, OAuthConfig};
use music_identity::error::{ProviderError, StoreError};
use music_identity::oauth::{
    ExternalIdentity, IdentityProvider, IdentityReconciler, OAuthProvider, ProviderToken,
};
use music_identity::store::{AccountStore, DatabaseAccountStore, StoreResult};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

pub async fn setup_test_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    let db = Arc::new(db);

    DatabaseAccountStore::new(db.clone())
        .create_schema()
        .await
        .expect("Failed to create account table");

    db
}

pub async fn exec(db: &DatabaseConnection, sql: String) {
    db.execute(Statement::from_string(DbBackend::Sqlite, sql))
        .await
        .expect("Failed to run SQL");
}

pub fn codec() -> SessionTokenCodec {
    SessionTokenCodec::new(SECRET.as_bytes(), time::Duration::hours(24))
}

pub fn auth_service(store: Arc<dyn AccountStore>) -> Arc<AuthService> {
    Arc::new(AuthService::new(store, codec()))
}

/// Auth service over a fresh sqlite database. The connection is returned for raw SQL.
pub async fn sqlite_auth() -> (Arc<DatabaseConnection>, Arc<AuthService>) {
    let db = setup_test_db().await;
    let store = Arc::new(DatabaseAccountStore::new(db.clone()));
    (db, auth_service(store))
}

pub fn test_config(frontend_url: &str, oauth: OAuthConfig) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        listen_addr: "127.0.0.1:0".into(),
        frontend_url: frontend_url.into(),
        jwt_secret: SECRET.into(),
        token_ttl_secs: 24 * 60 * 60,
        oauth,
    }
}

pub fn resources(auth: Arc<AuthService>, oauth: IdentityReconciler, config: AppConfig) -> AppResources {
    AppResources {
        auth,
        oauth: Arc::new(oauth),
        config: Arc::new(config),
    }
}

pub fn identity(provider: OAuthProvider, email: &str, external_id: &str) -> ExternalIdentity {
    ExternalIdentity {
        email: email.into(),
        name: Some("Test User".into()),
        avatar_url: Some("https://cdn.example.com/avatar.png".into()),
        external_id: external_id.into(),
        provider,
    }
}

/// Provider that accepts any code and returns a fixed identity.
pub struct StubProvider {
    pub identity: ExternalIdentity,
}

impl StubProvider {
    pub fn new(identity: ExternalIdentity) -> Arc<Self> {
        Arc::new(Self { identity })
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn kind(&self) -> OAuthProvider {
        self.identity.provider
    }

    fn authorization_url(&self, state: &str) -> Result<Url, ProviderError> {
        Ok(Url::parse_with_params("https://provider.example.com/auth", &[("state", state)])
            .expect("static url"))
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        if code == "bad-code" {
            return Err(ProviderError::Exchange {
                provider: self.identity.provider,
                reason: "invalid_grant".into(),
            });
        }
        Ok(ProviderToken::bearer(format!("token-for-{code}")))
    }

    async fn fetch_identity(&self, _token: &ProviderToken) -> Result<ExternalIdentity, ProviderError> {
        Ok(self.identity.clone())
    }
}

/// Delegates to a real store but can fail selected best-effort writes, or
/// hide existing emails from lookups so inserts hit the unique constraint.
pub struct FlakyStore {
    pub inner: Arc<dyn AccountStore>,
    pub hide_emails: bool,
    pub fail_last_login: bool,
    pub fail_link: bool,
    pub fail_last_track: bool,
}

impl FlakyStore {
    pub fn wrap(inner: Arc<dyn AccountStore>) -> Self {
        Self {
            inner,
            hide_emails: false,
            fail_last_login: false,
            fail_link: false,
            fail_last_track: false,
        }
    }
}

fn injected() -> StoreError {
    StoreError::Corrupt("injected failure".into())
}

#[async_trait]
impl AccountStore for FlakyStore {
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        self.inner.create_account(account).await
    }

    async fn create_oauth_account(&self, account: NewOAuthAccount) -> StoreResult<Account> {
        self.inner.create_oauth_account(account).await
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Account> {
        if self.hide_emails {
            return Err(StoreError::NotFound);
        }
        self.inner.get_by_email(email).await
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Account> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_provider_and_external_id(
        &self,
        provider: AuthProvider,
        external_id: &str,
    ) -> StoreResult<Account> {
        self.inner
            .get_by_provider_and_external_id(provider, external_id)
            .await
    }

    async fn update_account(&self, id: i64, update: IdentityUpdate) -> StoreResult<()> {
        self.inner.update_account(id, update).await
    }

    async fn update_last_login(&self, id: i64, at: OffsetDateTime) -> StoreResult<()> {
        if self.fail_last_login {
            return Err(injected());
        }
        self.inner.update_last_login(id, at).await
    }

    async fn link_provider(
        &self,
        id: i64,
        provider: AuthProvider,
        external_id: &str,
    ) -> StoreResult<()> {
        if self.fail_link {
            return Err(injected());
        }
        self.inner.link_provider(id, provider, external_id).await
    }

    async fn last_played_track(&self, id: i64) -> StoreResult<Option<LastTrack>> {
        if self.fail_last_track {
            return Err(injected());
        }
        self.inner.last_played_track(id).await
    }
}
