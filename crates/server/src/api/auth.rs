//! Bearer-token extractors and the JSON error body shared by every endpoint.
//!
//! - [`BearerAuth`] rejects the request unless a valid session token is present.
//! - [`OptionalBearerAuth`] never rejects; bad tokens make the caller anonymous.
//! - [`RequireAuth`] / [`RequireAdmin`] re-read the account and check its
//!   current role, so a demotion takes effect before the token expires.

use crate::AppResources;
use crate::account::{Account, Role};
use crate::auth::SessionIdentity;
use crate::error::{AuthError as ServiceError, ProviderError};
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code (e.g., "invalid_token", "conflict")
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl ApiError {
    fn new(error: &str, description: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn invalid_token(description: impl Into<String>) -> Self {
        Self::new("invalid_token", description)
    }

    pub fn invalid_credentials() -> Self {
        Self::new("invalid_credentials", "invalid email or password")
    }

    pub fn conflict(description: impl Into<String>) -> Self {
        Self::new("conflict", description)
    }

    pub fn forbidden(description: impl Into<String>) -> Self {
        Self::new("forbidden", description)
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self::new("not_found", description)
    }

    pub fn bad_request(description: impl Into<String>) -> Self {
        Self::new("bad_request", description)
    }

    pub fn server_error() -> Self {
        Self {
            error: "server_error".to_string(),
            error_description: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "invalid_token" | "invalid_credentials" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "bad_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match &err {
            ServiceError::DuplicateEmail
            | ServiceError::ProviderConflict { .. }
            | ServiceError::ExternalIdentityTaken { .. } => ApiError::conflict(err.to_string()),
            ServiceError::InvalidCredentials => ApiError::invalid_credentials(),
            ServiceError::InvalidToken => ApiError::invalid_token(err.to_string()),
            ServiceError::GuestNotFound(_) | ServiceError::AccountNotFound(_) => {
                ApiError::not_found(err.to_string())
            }
            ServiceError::InvalidInput(_)
            | ServiceError::UnsupportedProvider(_)
            | ServiceError::InvalidState(_) => ApiError::bad_request(err.to_string()),
            ServiceError::Provider(
                ProviderError::UnverifiedEmail { .. } | ProviderError::MissingEmail { .. },
            ) => ApiError::forbidden(err.to_string()),
            ServiceError::Provider(
                ProviderError::Exchange { .. } | ProviderError::UserInfo { .. },
            ) => {
                tracing::error!(error = %err, "OAuth provider request failed");
                ApiError::server_error()
            }
            ServiceError::Provider(ProviderError::Configuration { .. })
            | ServiceError::Hashing(_)
            | ServiceError::Signing(_)
            | ServiceError::Store { .. } => {
                tracing::error!(error = %err, "request failed");
                ApiError::server_error()
            }
        }
    }
}

fn resources(parts: &Parts) -> Result<AppResources, ApiError> {
    parts.extensions.get::<AppResources>().cloned().ok_or_else(|| {
        tracing::error!("AppResources not found in extensions");
        ApiError::server_error()
    })
}

/// `Authorization: Bearer <token>`, exactly two space-separated parts.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut pieces = header.split(' ');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Axum extractor for a required session token.
///
/// # Example
///
/// ```ignore
/// async fn handler(BearerAuth(identity): BearerAuth) -> impl IntoResponse {
///     format!("Hello, account {}", identity.account_id)
/// }
/// ```
pub struct BearerAuth(pub SessionIdentity);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let resources = resources(parts)?;
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::invalid_token("missing or malformed Authorization header"))?;
        let identity = resources
            .auth
            .validate_token(token)
            .map_err(|_| ApiError::invalid_token("invalid or expired token"))?;
        Ok(BearerAuth(identity))
    }
}

/// Like [`BearerAuth`] but any token problem yields `None`.
pub struct OptionalBearerAuth(pub Option<SessionIdentity>);

impl<S> FromRequestParts<S> for OptionalBearerAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let resources = resources(parts)?;
        let identity = bearer_token(parts).and_then(|token| resources.auth.validate_token(token).ok());
        Ok(OptionalBearerAuth(identity))
    }
}

async fn current_account(parts: &mut Parts) -> Result<Account, ApiError> {
    let resources = resources(parts)?;
    let BearerAuth(identity) = BearerAuth::from_request_parts(parts, &()).await?;
    match resources.auth.current_account(identity.account_id).await {
        Ok(account) => Ok(account),
        Err(ServiceError::AccountNotFound(id)) => {
            tracing::warn!(user_id = id, "token refers to a missing account");
            Err(ApiError::invalid_token("account no longer exists"))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load account for role check");
            Err(ApiError::server_error())
        }
    }
}

/// Any signed-in account whose current role is user, admin or guest.
pub struct RequireAuth(pub Account);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = current_account(parts).await?;
        match account.role {
            Role::User | Role::Admin | Role::Guest => Ok(RequireAuth(account)),
            Role::Unrecognized => Err(ApiError::forbidden("account role is not permitted")),
        }
    }
}

/// An account whose current role is admin.
pub struct RequireAdmin(pub Account);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = current_account(parts).await?;
        if account.role != Role::Admin {
            return Err(ApiError::forbidden("admin access required"));
        }
        Ok(RequireAdmin(account))
    }
}
