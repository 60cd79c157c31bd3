//! HTTP wiring for the issuance server.
//!
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration
//!
//! The protocol endpoints themselves live in [`crate::oauth2`].

pub mod health;
pub mod openapi;

pub use health::MISC_TAG;

use crate::oauth2::{self, OAuth2State, authorize::AUTH_SESSION_HEADER};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// CORS policy for browser clients. No configured origins means any origin.
pub fn cors_layer(allowed_origins: &[String]) -> color_eyre::Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }
    let origins = allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(AUTH_SESSION_HEADER),
        ])
        .allow_credentials(true))
}

/// Build the full application router, including the API docs.
pub fn build_router(state: OAuth2State) -> color_eyre::Result<Router> {
    let cors = cors_layer(&state.config.allowed_origins)?;

    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .merge(oauth2::router(state))
        .routes(routes!(health::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    Ok(router.merge(Redoc::with_url("/api-docs", api)))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(state))]
pub async fn start_webserver(state: OAuth2State) -> color_eyre::Result<()> {
    let addr = state.config.bind_address;
    let router = build_router(state)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, router)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_origins() {
        assert!(cors_layer(&["https://shop.example".into()]).is_ok());
        assert!(cors_layer(&["bad\norigin".into()]).is_err());
    }
}
