//! HTTP surface of the identity service.
//!
//! - `session` - register, login, guest, me (/api/auth/*)
//! - `oauth` - provider login and callback (/api/auth/{provider}/*)
//! - `auth` - bearer extractors and the JSON error body
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod auth;
pub mod oauth;
pub mod openapi;
pub mod session;

pub use oauth::OAUTH_TAG;
pub use session::SESSION_TAG;

use crate::AppResources;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_redoc::{Redoc, Servable};

/// Builds the full router with resources, CORS, tracing and the Redoc page.
pub fn router(app_resources: AppResources) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/api/auth", session::router().merge(oauth::router()))
        .layer(axum::Extension(app_resources))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(app_resources))]
pub async fn start_webserver(app_resources: AppResources) -> color_eyre::Result<()> {
    let addr = app_resources.config.listen_addr.clone();
    let router = router(app_resources);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
