//! HS256 session tokens.
//!
//! A token is valid in the half-open window `[nbf, exp)`. Every validation
//! failure collapses into [`TokenError::Invalid`] so callers cannot tell a bad
//! signature from an expired token.

use crate::account::Role;
use crate::error::TokenError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: i64,
    /// Empty for guests.
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Identity carried by a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub account_id: i64,
    pub role: Role,
    pub email: String,
}

impl From<SessionClaims> for SessionIdentity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            account_id: claims.user_id,
            role: claims.role,
            email: claims.email,
        }
    }
}

#[derive(Clone)]
pub struct SessionTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secret_usable: bool,
    ttl: Duration,
}

impl fmt::Debug for SessionTokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenCodec")
            .field("secret_usable", &self.secret_usable)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionTokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            secret_usable: !secret.is_empty(),
            ttl,
        }
    }

    pub fn issue(&self, account_id: i64, email: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(account_id, email, role, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        account_id: i64,
        email: &str,
        role: Role,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        if !self.secret_usable {
            return Err(TokenError::Signing("signing secret is empty".into()));
        }
        let expires = now
            .checked_add(self.ttl)
            .ok_or_else(|| TokenError::Signing("token lifetime overflows the clock".into()))?;
        let issued = now.unix_timestamp();
        let claims = SessionClaims {
            user_id: account_id,
            email: email.to_string(),
            role,
            iat: issued,
            nbf: issued,
            exp: expires.unix_timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<SessionIdentity, TokenError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    pub fn validate_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<SessionIdentity, TokenError> {
        if !self.secret_usable {
            return Err(TokenError::Invalid);
        }
        let claims = decode::<SessionClaims>(token, &self.decoding, &self.validation())
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                TokenError::Invalid
            })?
            .claims;

        let now = now.unix_timestamp();
        if now < claims.nbf || now >= claims.exp {
            return Err(TokenError::Invalid);
        }
        Ok(claims.into())
    }

    // Time checks are done by hand so the window is exact and clock-injectable.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "iat"]);
        validation
    }
}
