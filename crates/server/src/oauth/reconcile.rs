//! Maps an external identity onto an account.
//!
//! Decision order for one callback:
//!
//! 1. An account with the identity's email exists: log into it. A local
//!    account gets the provider linked; an account tagged with a different
//!    provider is a conflict.
//! 2. An account already holds this (provider, external id) pair: log into it.
//! 3. The state carried a guest id: promote that guest in place.
//! 4. Otherwise create a new OAuth account.
//!
//! A guest id is ignored by branches 1 and 2. The guest's history is not merged.

use super::{
    ExternalIdentity, GoogleProvider, IdentityProvider, OAuthProvider, OAuthState, YandexProvider,
};
use crate::account::{Account, AuthProvider, NewOAuthAccount, normalize_email};
use crate::auth::{AuthService, AuthSession, BestEffort};
use crate::config::OAuthConfig;
use crate::error::{AuthError, ProviderError, StateError};
use crate::store::OptionalExt;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Logged into an account that already carried this provider, or none.
    ExistingAccount,
    /// Logged into a local account and attached the provider to it.
    Linked(BestEffort),
    Promoted { guest_id: i64 },
    Created,
}

#[derive(Debug, Clone)]
pub struct OAuthLogin {
    pub session: AuthSession,
    pub outcome: ReconcileOutcome,
}

#[derive(Clone)]
pub struct IdentityReconciler {
    auth: Arc<AuthService>,
    providers: HashMap<OAuthProvider, Arc<dyn IdentityProvider>>,
}

impl IdentityReconciler {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            providers: HashMap::new(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Registers Google and Yandex. Unconfigured providers fail when used.
    pub fn from_config(auth: Arc<AuthService>, config: &OAuthConfig, http: reqwest::Client) -> Self {
        for (provider, cfg) in [
            (OAuthProvider::Google, &config.google),
            (OAuthProvider::Yandex, &config.yandex),
        ] {
            if !cfg.is_configured() {
                tracing::warn!(provider = %provider, "OAuth client credentials missing, provider login disabled");
            }
        }
        Self::new(auth)
            .with_provider(Arc::new(GoogleProvider::new(&config.google, http.clone())))
            .with_provider(Arc::new(YandexProvider::new(&config.yandex, http)))
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    fn provider(&self, kind: OAuthProvider) -> Result<&Arc<dyn IdentityProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .ok_or_else(|| ProviderError::Configuration {
                provider: kind,
                reason: "provider is not registered".into(),
            })
    }

    /// Provider login URL whose state carries `guest_id`.
    #[tracing::instrument(skip(self))]
    pub fn authorization_url(
        &self,
        provider: OAuthProvider,
        guest_id: Option<i64>,
    ) -> Result<Url, AuthError> {
        let state = OAuthState::new(provider, guest_id);
        let url = self.provider(provider)?.authorization_url(&state.to_string())?;
        tracing::info!(provider = %provider, has_guest = state.guest_id.is_some(), "generated OAuth login URL");
        Ok(url)
    }

    #[tracing::instrument(skip(self, code, state))]
    pub async fn handle_callback(
        &self,
        provider: OAuthProvider,
        code: &str,
        state: &str,
    ) -> Result<OAuthLogin, AuthError> {
        let state: OAuthState = state.parse()?;
        if state.provider != provider {
            return Err(StateError::ProviderMismatch {
                expected: provider,
                found: state.provider,
            }
            .into());
        }

        let adapter = self.provider(provider)?;
        let token = adapter.exchange_code(code).await?;
        let identity = adapter.fetch_identity(&token).await?;
        tracing::info!(provider = %provider, external_id = %identity.external_id, "fetched external identity");

        self.reconcile(identity, state.guest_id).await
    }

    #[tracing::instrument(skip(self, identity), fields(provider = %identity.provider))]
    pub async fn reconcile(
        &self,
        mut identity: ExternalIdentity,
        guest_id: Option<i64>,
    ) -> Result<OAuthLogin, AuthError> {
        identity.email = normalize_email(&identity.email);
        let store = self.auth.store();

        if let Some(account) = store
            .get_by_email(&identity.email)
            .await
            .optional()
            .map_err(AuthError::store("looking up email"))?
        {
            return self.login_existing(account, &identity, guest_id).await;
        }

        if let Some(account) = store
            .get_by_provider_and_external_id(identity.provider.into(), &identity.external_id)
            .await
            .optional()
            .map_err(AuthError::store("looking up external identity"))?
        {
            return self.login_existing(account, &identity, guest_id).await;
        }

        if let Some(guest_id) = guest_id {
            let session = self.auth.promote_guest_to_user(guest_id, &identity).await?;
            return Ok(OAuthLogin {
                session,
                outcome: ReconcileOutcome::Promoted { guest_id },
            });
        }

        let account = store
            .create_oauth_account(NewOAuthAccount {
                email: identity.email.clone(),
                name: identity.name.clone().filter(|n| !n.is_empty()),
                provider: identity.provider.into(),
                external_id: identity.external_id.clone(),
            })
            .await
            .map_err(AuthError::identity_write(
                "creating OAuth account",
                identity.provider.into(),
            ))?;
        tracing::info!(user_id = account.id, "created OAuth account");

        let token = self.auth.issue_token(&account)?;
        Ok(OAuthLogin {
            session: AuthSession {
                token,
                account,
                last_track: None,
                last_login: None,
            },
            outcome: ReconcileOutcome::Created,
        })
    }

    async fn login_existing(
        &self,
        mut account: Account,
        identity: &ExternalIdentity,
        guest_id: Option<i64>,
    ) -> Result<OAuthLogin, AuthError> {
        if let Some(guest_id) = guest_id {
            tracing::info!(user_id = account.id, guest_id, "existing account found, guest session discarded");
        }

        let incoming: AuthProvider = identity.provider.into();
        match account.provider {
            Some(existing) if !account.is_local() && existing != incoming => {
                tracing::info!(user_id = account.id, existing = %existing, incoming = %incoming, "provider conflict");
                return Err(AuthError::ProviderConflict { existing });
            }
            _ => {}
        }

        let outcome = if account.is_local() {
            let linked = BestEffort::record(
                "provider link",
                account.id,
                self.auth
                    .store()
                    .link_provider(account.id, incoming, &identity.external_id)
                    .await,
            );
            if linked.is_applied() {
                tracing::info!(user_id = account.id, provider = %incoming, "linked provider to local account");
                account.provider = Some(incoming);
                account.external_id = Some(identity.external_id.clone());
            }
            ReconcileOutcome::Linked(linked)
        } else {
            ReconcileOutcome::ExistingAccount
        };

        let last_login = self.auth.touch_last_login(&mut account).await;
        let token = self.auth.issue_token(&account)?;
        Ok(OAuthLogin {
            session: AuthSession {
                token,
                account,
                last_track: None,
                last_login: Some(last_login),
            },
            outcome,
        })
    }
}
