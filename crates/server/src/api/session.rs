//! Local session endpoints.
//!
//! - `POST /register` - Create a local account
//! - `POST /login` - Email/password login
//! - `POST /guest` - Start an anonymous guest session
//! - `GET /me` - Current account profile

use crate::AppResources;
use crate::account::{Account, LastTrack};
use crate::api::auth::{ApiError, RequireAuth};
use crate::auth::AuthSession;
use axum::{Extension, Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const SESSION_TAG: &str = "Sessions";

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address, stored lower-cased
    pub email: String,
    /// At least 6 characters
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer session token
    pub token: String,
    pub user: Account,
    /// Where playback stopped last time, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_track: Option<LastTrack>,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: session.account,
            last_track: session.last_track,
        }
    }
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(register))
        .routes(routes!(login))
        .routes(routes!(guest))
        .routes(routes!(me))
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/register",
    tag = SESSION_TAG,
    operation_id = "Register",
    summary = "Register a local account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid email or password too short", body = ApiError),
        (status = 409, description = "Email already exists", body = ApiError),
    )
)]
async fn register(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let session = resources
        .auth
        .register(&payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/login",
    tag = SESSION_TAG,
    operation_id = "Login",
    summary = "Log in with email and password",
    description = "Unknown email, accounts without a password and wrong passwords \
                   all produce the same error.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = ApiError),
    )
)]
async fn login(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = resources
        .auth
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(session.into()))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    post,
    path = "/guest",
    tag = SESSION_TAG,
    operation_id = "Guest Login",
    summary = "Start a guest session",
    description = "Creates an anonymous account. Signing in with an OAuth provider \
                   while holding a guest token promotes the guest in place.",
    responses(
        (status = 200, description = "Guest session", body = AuthResponse),
    )
)]
async fn guest(Extension(resources): Extension<AppResources>) -> Result<Json<AuthResponse>, ApiError> {
    let session = resources.auth.guest_login().await?;
    Ok(Json(session.into()))
}

#[tracing::instrument(skip(auth), fields(user_id = auth.0.id))]
#[utoipa::path(
    get,
    path = "/me",
    tag = SESSION_TAG,
    operation_id = "Current Account",
    summary = "Current account profile",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Account profile", body = Account),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Account role not permitted", body = ApiError),
    )
)]
async fn me(auth: RequireAuth) -> Json<Account> {
    Json(auth.0)
}
