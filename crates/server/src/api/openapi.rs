//! OpenAPI/Utoipa configuration.

use crate::api::health::MISC_TAG;
use crate::oauth2::OAUTH2_TAG;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{
        ApiKey, ApiKeyValue, AuthorizationCode, Flow, HttpAuthScheme, HttpBuilder, OAuth2,
        Scopes, SecurityScheme,
    },
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        let bearer = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .bearer_format("JWT")
            .description(Some(
                "Access token obtained from the `/api/oauth/token` endpoint.",
            ))
            .build();
        components.add_security_scheme("bearer_auth", SecurityScheme::Http(bearer));

        components.add_security_scheme(
            "auth_session",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-Auth-Session",
                "Session id returned by `/api/auth/login`.",
            ))),
        );

        let oauth2 = OAuth2::new([Flow::AuthorizationCode(AuthorizationCode::new(
            "/api/oauth/authorize",
            "/api/oauth/token",
            Scopes::from_iter([
                ("openid", "OpenID Connect scope"),
                ("email", "Access to user email"),
            ]),
        ))]);
        components.add_security_scheme("OAuth2", SecurityScheme::OAuth2(oauth2));
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Auth Hub API",
        version = "1.0.0",
        description = "OAuth2 Authorization Code + PKCE and OpenID Connect token issuance."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = OAUTH2_TAG, description = "OAuth2 / OpenID Connect endpoints")
    )
)]
pub struct ApiDoc;
