//! Account store contract.
//!
//! The store is the system of record for accounts. Nothing in this crate caches
//! account state across requests; every read goes through this trait.

mod database;

pub use database::DatabaseAccountStore;

use crate::account::{Account, AuthProvider, IdentityUpdate, LastTrack, NewAccount, NewOAuthAccount};
use crate::error::StoreError;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations the identity subsystem needs.
///
/// Lookups return [`StoreError::NotFound`] when no row matches, distinct from
/// every other failure.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a local or guest account
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    /// Insert an account first seen through an OAuth provider
    async fn create_oauth_account(&self, account: NewOAuthAccount) -> StoreResult<Account>;

    async fn get_by_email(&self, email: &str) -> StoreResult<Account>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Account>;

    async fn get_by_provider_and_external_id(
        &self,
        provider: AuthProvider,
        external_id: &str,
    ) -> StoreResult<Account>;

    /// Replace the identity fields of an existing account
    async fn update_account(&self, id: i64, update: IdentityUpdate) -> StoreResult<()>;

    async fn update_last_login(&self, id: i64, at: OffsetDateTime) -> StoreResult<()>;

    /// Attach an OAuth identity to an account without touching its role or password
    async fn link_provider(
        &self,
        id: i64,
        provider: AuthProvider,
        external_id: &str,
    ) -> StoreResult<()>;

    /// Last track the account played, if the player recorded one
    async fn last_played_track(&self, id: i64) -> StoreResult<Option<LastTrack>>;
}

/// Turns the not-found sentinel into `None`.
pub trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
