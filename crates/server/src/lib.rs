//! Identity and session subsystem for a media-streaming backend.
//!
//! Issues and validates bearer session tokens for three kinds of account:
//! anonymous guests, local email/password accounts and accounts signed in
//! through Google or Yandex. OAuth sign-ins are reconciled against existing
//! accounts, linking local accounts and promoting guests in place.

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::oauth::IdentityReconciler;

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod entity;
pub mod error;
pub mod oauth;
pub mod store;

#[derive(Clone)]
pub struct AppResources {
    pub auth: Arc<AuthService>,
    pub oauth: Arc<IdentityReconciler>,
    pub config: Arc<AppConfig>,
}
