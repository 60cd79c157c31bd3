//! OAuth2 / OpenID Connect issuance endpoints.
//!
//! ## Supported Flows
//!
//! - Authorization Code with PKCE (S256 only)
//! - Refresh Token with rotation
//!
//! ## Endpoints
//!
//! - `POST /api/auth/login` - Open an auth session
//! - `GET /api/oauth/authorize` - Authorization endpoint
//! - `POST /api/oauth/token` - Token endpoint
//! - `POST /api/oauth/revoke` - Token revocation
//! - `GET /api/oauth/userinfo` - OpenID Connect UserInfo
//! - `GET /.well-known/jwks.json` - Signing keys
//! - `GET /.well-known/openid-configuration` - OpenID Connect Discovery

pub mod authorize;
pub mod discovery;
pub mod grant;
pub mod login;
pub mod revoke;
mod state;
pub mod userinfo;

pub use state::OAuth2State;

use axum::http::header;
use axum::response::IntoResponse;
use utoipa_axum::{router::OpenApiRouter, routes};

/// OpenAPI tag for OAuth2 endpoints
pub const OAUTH2_TAG: &str = "OAuth2";

/// Creates the OAuth2 router.
pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .nest(
            "/api/auth",
            OpenApiRouter::new().routes(routes!(login::login)),
        )
        .nest(
            "/api/oauth",
            OpenApiRouter::new()
                .routes(routes!(authorize::authorize))
                .routes(routes!(grant::token))
                .routes(routes!(revoke::revoke))
                .routes(routes!(userinfo::userinfo)),
        )
        .routes(routes!(discovery::jwks))
        .routes(routes!(discovery::openid_configuration))
        .with_state(state)
}

/// Responses carrying credentials must not be cached.
pub(crate) fn no_store(body: impl IntoResponse) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store"), (header::PRAGMA, "no-cache")],
        body,
    )
}
