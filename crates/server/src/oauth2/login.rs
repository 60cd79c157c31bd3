//! Login endpoint.
//!
//! Turns verified credentials into a short-lived [`AuthSession`] that the browser presents
//! to the authorization endpoint.

use crate::error::{CredentialError, ErrorResponse, OAuthError};
use crate::model::AuthSession;
use crate::oauth2::{OAUTH2_TAG, no_store, state::OAuth2State};
use crate::random::{SECRET_ID_BYTES, random_hex};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Cookie carrying the auth session id.
pub const AUTH_SESSION_COOKIE: &str = "auth_session";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Value for the `X-Auth-Session` header of the authorization request.
    pub session_id: String,
    /// Seconds until the session expires.
    pub expires_in: u64,
}

/// Verify credentials and open an authenticated session.
pub async fn authenticate(
    state: &OAuth2State,
    email: &str,
    password: &str,
) -> Result<AuthSession, OAuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(OAuthError::unauthorized("email and password are required"));
    }

    let email = match state.credentials.verify(email, password).await {
        Ok(email) => email,
        Err(CredentialError::InvalidCredentials) => {
            tracing::warn!("login rejected");
            return Err(OAuthError::unauthorized("invalid email or password"));
        }
        Err(e) => {
            tracing::error!(error = %e, "credential backend failure");
            return Err(OAuthError::Internal(e.to_string()));
        }
    };

    let user = state.users.get_or_create(&email).await?;
    let now = OffsetDateTime::now_utc();
    let ttl = state.config.tokens.auth_session_ttl();
    let session = AuthSession {
        session_id: random_hex(SECRET_ID_BYTES)?,
        user_id: user.id,
        email: user.email,
        created_at: now,
        expires_at: now + ttl,
        is_logged_in: true,
    };
    state
        .auth_sessions
        .save(&session.session_id, &session)
        .await?;

    tracing::info!(user_id = %session.user_id, "auth session created");
    Ok(session)
}

#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/login",
    tag = OAUTH2_TAG,
    operation_id = "Login",
    summary = "Authenticate and open an auth session",
    description = "Verifies email and password. On success returns the auth session id and sets it \
                   as the `auth_session` cookie. The session is valid for ten minutes and is required \
                   by the authorization endpoint.",
    request_body(content = LoginRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 400, description = "Malformed JSON body", body = ErrorResponse),
        (status = 401, description = "Missing fields or rejected credentials", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<OAuth2State>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, OAuthError> {
    let Json(request) = body.map_err(|e| OAuthError::invalid_request(e.body_text()))?;
    let session = authenticate(
        &state,
        request.email.as_deref().unwrap_or_default(),
        request.password.as_deref().unwrap_or_default(),
    )
    .await?;

    let expires_in = state.config.tokens.auth_session_lifetime;
    let cookie = format!(
        "{AUTH_SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={expires_in}",
        session.session_id
    );
    let cookie =
        HeaderValue::from_str(&cookie).map_err(|e| OAuthError::Internal(e.to_string()))?;

    let mut response = no_store(Json(LoginResponse {
        session_id: session.session_id,
        expires_in,
    }))
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}
