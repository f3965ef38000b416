use super::password::{hash_password, verify_password};
use super::token::{SessionIdentity, SessionTokenCodec};
use super::{AuthSession, BestEffort};
use crate::account::{Account, IdentityUpdate, NewAccount, Role, normalize_email};
use crate::error::{AuthError, StoreError};
use crate::oauth::ExternalIdentity;
use crate::store::AccountStore;
use std::sync::Arc;
use time::OffsetDateTime;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Entry point for every flow that ends in a session token.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    tokens: SessionTokenCodec,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountStore>, tokens: SessionTokenCodec) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        validate_registration(&email, password)?;

        match self.store.get_by_email(&email).await {
            Ok(_) => return Err(AuthError::DuplicateEmail),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(AuthError::store("looking up email")(e)),
        }

        let hash = hash_password(password).map_err(|e| AuthError::Hashing(e.to_string()))?;
        let account = self
            .store
            .create_account(NewAccount::local(email, hash))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => AuthError::DuplicateEmail,
                other => AuthError::store("creating account")(other),
            })?;

        tracing::info!(user_id = account.id, "registered local account");
        let token = self.issue_token(&account)?;
        Ok(AuthSession {
            token,
            account,
            last_track: None,
            last_login: None,
        })
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let mut account = match self.store.get_by_email(&email).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(AuthError::store("looking up email")(e)),
        };

        let Some(hash) = account.password_hash.as_deref() else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let last_login = self.touch_last_login(&mut account).await;
        let last_track = match self.store.last_played_track(account.id).await {
            Ok(track) => track,
            Err(e) => {
                tracing::warn!(user_id = account.id, error = %e, "failed to load last played track");
                None
            }
        };

        let token = self.issue_token(&account)?;
        Ok(AuthSession {
            token,
            account,
            last_track,
            last_login: Some(last_login),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn guest_login(&self) -> Result<AuthSession, AuthError> {
        let mut account = self
            .store
            .create_account(NewAccount::guest())
            .await
            .map_err(AuthError::store("creating guest account"))?;

        tracing::info!(user_id = account.id, "created guest account");
        let last_login = self.touch_last_login(&mut account).await;
        let token = self.issue_token(&account)?;
        Ok(AuthSession {
            token,
            account,
            last_track: None,
            last_login: Some(last_login),
        })
    }

    /// Turns a guest account into an OAuth account in place. The id is kept.
    #[tracing::instrument(skip(self, identity), fields(provider = %identity.provider))]
    pub async fn promote_guest_to_user(
        &self,
        guest_id: i64,
        identity: &ExternalIdentity,
    ) -> Result<AuthSession, AuthError> {
        let guest = match self.store.get_by_id(guest_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AuthError::GuestNotFound(guest_id)),
            Err(e) => return Err(AuthError::store("looking up guest")(e)),
        };
        if !guest.is_guest() {
            tracing::warn!(user_id = guest_id, role = %guest.role, "refusing to promote non-guest account");
            return Err(AuthError::GuestNotFound(guest_id));
        }

        let update = IdentityUpdate {
            email: Some(normalize_email(&identity.email)),
            name: identity.name.clone().filter(|n| !n.is_empty()),
            avatar_url: identity.avatar_url.clone().filter(|a| !a.is_empty()),
            provider: Some(identity.provider.into()),
            external_id: Some(identity.external_id.clone()),
            role: Role::User,
        };
        self.store
            .update_account(guest_id, update)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::GuestNotFound(guest_id),
                other => AuthError::identity_write("promoting guest", identity.provider.into())(other),
            })?;

        let mut account = self
            .store
            .get_by_id(guest_id)
            .await
            .map_err(AuthError::store("reloading promoted guest"))?;

        tracing::info!(user_id = guest_id, "promoted guest account");
        let last_login = self.touch_last_login(&mut account).await;
        let token = self.issue_token(&account)?;
        Ok(AuthSession {
            token,
            account,
            last_track: None,
            last_login: Some(last_login),
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        Ok(self.tokens.validate(token)?)
    }

    /// Fresh read of an account, used by the role gates.
    pub async fn current_account(&self, account_id: i64) -> Result<Account, AuthError> {
        match self.store.get_by_id(account_id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(AuthError::AccountNotFound(account_id)),
            Err(e) => Err(AuthError::store("loading account")(e)),
        }
    }

    pub(crate) fn issue_token(&self, account: &Account) -> Result<String, AuthError> {
        let email = account.email.as_deref().unwrap_or_default();
        Ok(self.tokens.issue(account.id, email, account.role)?)
    }

    pub(crate) async fn touch_last_login(&self, account: &mut Account) -> BestEffort {
        let now = OffsetDateTime::now_utc();
        let outcome = BestEffort::record(
            "last login update",
            account.id,
            self.store.update_last_login(account.id, now).await,
        );
        if outcome.is_applied() {
            account.last_login_at = Some(now);
        }
        outcome
    }
}

fn validate_registration(email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::InvalidInput("a valid email is required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
