//! Local authentication: credentials, session tokens and the service that ties
//! them to the account store.
//!
//! - `password` - Argon2id hashing
//! - `token` - HS256 session token codec
//! - `service` - registration, login, guest sessions, guest promotion

pub mod password;
pub mod service;
pub mod token;

pub use password::{hash_password, verify_password};
pub use service::{AuthService, MIN_PASSWORD_LENGTH};
pub use token::{SessionClaims, SessionIdentity, SessionTokenCodec};

use crate::account::{Account, LastTrack};
use crate::error::StoreError;

/// Outcome of a write that must never fail the surrounding operation.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    Applied,
    Failed(String),
}

impl BestEffort {
    pub fn is_applied(&self) -> bool {
        matches!(self, BestEffort::Applied)
    }

    /// Logs a failed write and turns it into a value.
    pub(crate) fn record(
        operation: &'static str,
        account_id: i64,
        result: Result<(), StoreError>,
    ) -> Self {
        match result {
            Ok(()) => BestEffort::Applied,
            Err(e) => {
                tracing::warn!(user_id = account_id, error = %e, "{operation} failed, continuing");
                BestEffort::Failed(e.to_string())
            }
        }
    }
}

/// A freshly authenticated session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub account: Account,
    pub last_track: Option<LastTrack>,
    /// `None` when the flow does not touch the last-login timestamp.
    pub last_login: Option<BestEffort>,
}
