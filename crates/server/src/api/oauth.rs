//! OAuth login endpoints.
//!
//! - `GET /{provider}/login` - Redirect to the provider
//! - `GET /{provider}/callback` - Provider redirect target; ends with a redirect
//!   to the frontend carrying the session token

use crate::AppResources;
use crate::account::Role;
use crate::api::auth::{ApiError, OptionalBearerAuth};
use crate::oauth::OAuthProvider;
use axum::{
    Extension,
    extract::{Path, Query},
    response::Redirect,
};
use serde::Deserialize;
use url::Url;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const OAUTH_TAG: &str = "OAuth";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code issued by the provider
    pub code: Option<String>,
    /// Round-trip state, `<provider>:guest:<id>`
    pub state: Option<String>,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(oauth_login))
        .routes(routes!(oauth_callback))
}

#[tracing::instrument(skip(resources, auth))]
#[utoipa::path(
    get,
    path = "/{provider}/login",
    tag = OAUTH_TAG,
    operation_id = "OAuth Login",
    summary = "Start an OAuth login",
    description = "Redirects to the provider's consent page. When called with a guest \
                   token the guest account is promoted on first sign-in.",
    params(("provider" = String, Path, description = "`google` or `yandex`")),
    responses(
        (status = 307, description = "Redirect to the provider"),
        (status = 400, description = "Unsupported provider", body = ApiError),
        (status = 500, description = "Provider not configured", body = ApiError),
    )
)]
async fn oauth_login(
    Extension(resources): Extension<AppResources>,
    Path(provider): Path<String>,
    OptionalBearerAuth(auth): OptionalBearerAuth,
) -> Result<Redirect, ApiError> {
    let provider: OAuthProvider = provider
        .parse()
        .map_err(|e: crate::error::UnsupportedProvider| ApiError::bad_request(e.to_string()))?;

    let guest_id = auth
        .filter(|identity| identity.role == Role::Guest)
        .map(|identity| identity.account_id);
    let url = resources.oauth.authorization_url(provider, guest_id)?;
    Ok(Redirect::temporary(url.as_str()))
}

#[tracing::instrument(skip(resources, params))]
#[utoipa::path(
    get,
    path = "/{provider}/callback",
    tag = OAUTH_TAG,
    operation_id = "OAuth Callback",
    summary = "OAuth provider callback",
    params(
        ("provider" = String, Path, description = "`google` or `yandex`"),
        CallbackParams
    ),
    responses(
        (status = 307, description = "Redirect to the frontend with `token` and `provider` query parameters"),
        (status = 400, description = "Missing code, malformed state or unsupported provider", body = ApiError),
        (status = 403, description = "Provider email missing or unverified", body = ApiError),
        (status = 409, description = "Email or provider account already belongs to another user", body = ApiError),
        (status = 500, description = "Provider request failed", body = ApiError),
    )
)]
async fn oauth_callback(
    Extension(resources): Extension<AppResources>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let provider: OAuthProvider = provider
        .parse()
        .map_err(|e: crate::error::UnsupportedProvider| ApiError::bad_request(e.to_string()))?;
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("no authorization code provided"))?;
    let state = params.state.unwrap_or_default();

    let login = resources
        .oauth
        .handle_callback(provider, &code, &state)
        .await?;

    let mut redirect = Url::parse(&resources.config.frontend_url).map_err(|e| {
        tracing::error!(error = %e, "frontend_url is not a valid URL");
        ApiError::server_error()
    })?;
    redirect
        .query_pairs_mut()
        .append_pair("token", &login.session.token)
        .append_pair("provider", provider.as_str());

    tracing::info!(user_id = login.session.account.id, provider = %provider, outcome = ?login.outcome, "OAuth login complete");
    Ok(Redirect::temporary(redirect.as_str()))
}
