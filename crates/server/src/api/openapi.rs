//! OpenAPI/Utoipa configuration.

use crate::api::{oauth::OAUTH_TAG, session::SESSION_TAG};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let bearer = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .description(Some(
                    "Session token returned by `/api/auth/login`, `/api/auth/register`, \
                     `/api/auth/guest` or the OAuth callback.",
                ))
                .build();
            components.add_security_scheme("Authorization", SecurityScheme::Http(bearer));
        }
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Music Identity API",
        version = "1.0.0",
        description = "Guest, local and OAuth accounts with signed bearer sessions."
    ),
    tags(
        (name = SESSION_TAG, description = "Registration, login and guest sessions"),
        (name = OAUTH_TAG, description = "Google and Yandex sign-in")
    )
)]
pub struct ApiDoc;
