use crate::account::AuthProvider;
use crate::oauth::OAuthProvider;
use thiserror::Error;

/// Errors surfaced by an [`AccountStore`](crate::store::AccountStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("corrupt account row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(sea_orm::DbErr),
}

impl StoreError {
    /// The violated constraint is the one on `email`. Database messages name
    /// the column (sqlite) or the `account_email_key` constraint (postgres).
    pub fn is_email_conflict(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(detail) if detail.contains("email"))
    }
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) => {
                StoreError::UniqueViolation(detail)
            }
            _ => StoreError::Database(err),
        }
    }
}

/// Session token failures. Validation never says which check failed.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign session token: {0}")]
    Signing(String),
    #[error("invalid or expired token")]
    Invalid,
}

#[derive(Debug, Error)]
#[error("unsupported OAuth provider: {0}")]
pub struct UnsupportedProvider(pub String);

/// Failures talking to an external OAuth provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} OAuth is not configured: {reason}")]
    Configuration {
        provider: OAuthProvider,
        reason: String,
    },
    #[error("{provider} code exchange failed: {reason}")]
    Exchange {
        provider: OAuthProvider,
        reason: String,
    },
    #[error("{provider} user info request failed: {reason}")]
    UserInfo {
        provider: OAuthProvider,
        reason: String,
    },
    #[error("{provider} reports the account email as unverified")]
    UnverifiedEmail { provider: OAuthProvider },
    #[error("{provider} returned no email address")]
    MissingEmail { provider: OAuthProvider },
}

/// Failures decoding the OAuth `state` round-trip parameter.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("malformed OAuth state: {0:?}")]
    Malformed(String),
    #[error(transparent)]
    Provider(#[from] UnsupportedProvider),
    #[error("OAuth state was issued for {found}, callback is for {expected}")]
    ProviderMismatch {
        expected: OAuthProvider,
        found: OAuthProvider,
    },
}

/// Service-level error returned by registration, login and OAuth reconciliation.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("email already exists")]
    DuplicateEmail,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("an account with this email already exists with provider: {existing}")]
    ProviderConflict { existing: AuthProvider },
    #[error("this {provider} account is already linked to another user")]
    ExternalIdentityTaken { provider: AuthProvider },
    #[error("guest account {0} not found")]
    GuestNotFound(i64),
    #[error("account {0} not found")]
    AccountNotFound(i64),
    #[error(transparent)]
    UnsupportedProvider(#[from] UnsupportedProvider),
    #[error(transparent)]
    InvalidState(#[from] StateError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("failed to sign session token: {0}")]
    Signing(String),
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AuthError {
    /// Wraps a store error with the operation that was being attempted.
    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> AuthError {
        move |source| AuthError::Store { context, source }
    }

    /// Maps a failed identity write. Unique violations become conflicts on
    /// whichever key was hit.
    pub(crate) fn identity_write(
        context: &'static str,
        provider: AuthProvider,
    ) -> impl FnOnce(StoreError) -> AuthError {
        move |source| match source {
            e if e.is_email_conflict() => AuthError::DuplicateEmail,
            StoreError::UniqueViolation(_) => AuthError::ExternalIdentityTaken { provider },
            other => AuthError::Store {
                context,
                source: other,
            },
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(reason) => AuthError::Signing(reason),
            TokenError::Invalid => AuthError::InvalidToken,
        }
    }
}
