//! The OAuth `state` round-trip value: `<provider>:guest:<guest id>`.
//!
//! A guest id of `0` means the login was started without a guest session.

use super::OAuthProvider;
use crate::error::StateError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OAuthState {
    pub provider: OAuthProvider,
    pub guest_id: Option<i64>,
}

impl OAuthState {
    pub fn new(provider: OAuthProvider, guest_id: Option<i64>) -> Self {
        Self {
            provider,
            guest_id: guest_id.filter(|id| *id > 0),
        }
    }
}

impl fmt::Display for OAuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:guest:{}", self.provider, self.guest_id.unwrap_or(0))
    }
}

impl FromStr for OAuthState {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || StateError::Malformed(s.to_string());
        let mut parts = s.splitn(3, ':');
        let (Some(provider), Some(marker), Some(id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if marker != "guest" {
            return Err(malformed());
        }
        let provider: OAuthProvider = provider.parse()?;
        let id: i64 = id.parse().map_err(|_| malformed())?;
        if id < 0 {
            return Err(malformed());
        }
        Ok(OAuthState::new(provider, Some(id)))
    }
}
