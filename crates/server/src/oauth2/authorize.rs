//! Authorization endpoint.
//!
//! Binds an authenticated session and the client's PKCE challenge to a single-use
//! authorization code. No tokens are issued here.

use crate::error::{ErrorResponse, OAuthError};
use crate::model::authorize_session::PKCE_METHOD_S256;
use crate::model::{AuthSession, AuthorizeSession, has_scope};
use crate::oauth2::login::AUTH_SESSION_COOKIE;
use crate::oauth2::state::{OAuth2State, non_empty};
use crate::oauth2::{OAUTH2_TAG, no_store};
use crate::random::{SECRET_ID_BYTES, random_hex};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};

pub const AUTH_SESSION_HEADER: &str = "x-auth-session";

/// OAuth2 authorization request parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeParams {
    /// Must be "code"
    pub response_type: Option<String>,
    /// Space-separated list of scopes, must include `openid`
    pub scope: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    /// PKCE code challenge (base64url-encoded SHA-256 of the verifier)
    pub code_challenge: Option<String>,
    /// Only `S256`; defaults to `S256` when absent
    pub code_challenge_method: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeResponse {
    pub authorization_code: String,
}

/// Load the auth session and check it can authorize.
pub async fn active_session(
    state: &OAuth2State,
    session_id: Option<&str>,
) -> Result<AuthSession, OAuthError> {
    let session_id = non_empty(session_id)
        .ok_or_else(|| OAuthError::unauthorized("missing auth session"))?;
    if !AuthSession::is_well_formed_id(session_id) {
        tracing::debug!("malformed auth session id");
        return Err(OAuthError::unauthorized("invalid auth session"));
    }

    let Some(session) = state.auth_sessions.get(session_id).await? else {
        return Err(OAuthError::unauthorized("invalid or expired auth session"));
    };
    if session.is_expired_at(OffsetDateTime::now_utc()) {
        tracing::debug!(user_id = %session.user_id, "auth session past expiry");
        return Err(OAuthError::unauthorized("auth session expired"));
    }
    if !session.is_logged_in {
        return Err(OAuthError::unauthorized("auth session is not logged in"));
    }
    Ok(session)
}

/// Issue an authorization code for `session`.
pub async fn issue_code(
    state: &OAuth2State,
    session: &AuthSession,
    params: &AuthorizeParams,
) -> Result<String, OAuthError> {
    if params.response_type.as_deref() != Some("code") {
        return Err(OAuthError::invalid_request("response_type must be 'code'"));
    }
    let scope = params.scope.as_deref().unwrap_or_default();
    if !has_scope(scope, "openid") {
        return Err(OAuthError::invalid_request("scope must include 'openid'"));
    }
    let (Some(client_id), Some(redirect_uri), Some(code_challenge)) = (
        non_empty(params.client_id.as_deref()),
        non_empty(params.redirect_uri.as_deref()),
        non_empty(params.code_challenge.as_deref()),
    ) else {
        return Err(OAuthError::invalid_request(
            "client_id, redirect_uri and code_challenge are required",
        ));
    };
    let client_id = state.require_client(
        Some(client_id),
        OAuthError::InvalidRequest,
        OAuthError::InvalidRequest,
    )?;
    let method = match non_empty(params.code_challenge_method.as_deref()) {
        None => PKCE_METHOD_S256,
        Some(PKCE_METHOD_S256) => PKCE_METHOD_S256,
        Some(other) => {
            return Err(OAuthError::invalid_request(format!(
                "unsupported code_challenge_method '{other}'"
            )));
        }
    };

    let record = AuthorizeSession {
        authorization_code: random_hex(SECRET_ID_BYTES)?,
        user_id: session.user_id.clone(),
        email: session.email.clone(),
        client_id,
        code_challenge: code_challenge.to_string(),
        code_challenge_method: method.to_string(),
        scope: scope.trim().to_string(),
        redirect_uri: redirect_uri.to_string(),
        created_at: OffsetDateTime::now_utc(),
    };
    state
        .authorize_sessions
        .save(&record.authorization_code, &record)
        .await?;

    tracing::info!(
        user_id = %record.user_id,
        client_id = %record.client_id,
        "authorization code issued"
    );
    Ok(record.authorization_code)
}

/// The session id from `X-Auth-Session`, falling back to the `auth_session` cookie.
fn session_id_from(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTH_SESSION_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// OAuth2 Authorization endpoint.
#[tracing::instrument(skip(state, headers, query))]
#[utoipa::path(
    get,
    path = "/authorize",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Authorize",
    summary = "Issue an authorization code",
    description = "Issues a single-use authorization code bound to the authenticated user, the client, \
                   the redirect URI and the PKCE challenge. The auth session from `/api/auth/login` is \
                   read from the `X-Auth-Session` header or the `auth_session` cookie.\n\n\
                   **PKCE:** only `S256` is supported.",
    params(
        AuthorizeParams,
        ("X-Auth-Session" = Option<String>, Header, description = "Auth session id returned by login."),
    ),
    responses(
        (status = 200, description = "Authorization code issued", body = AuthorizeResponse),
        (status = 400, description = "Invalid parameters or unknown client", body = ErrorResponse),
        (status = 401, description = "Missing, invalid or expired auth session", body = ErrorResponse),
    )
)]
pub async fn authorize(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
    query: Result<Query<AuthorizeParams>, QueryRejection>,
) -> Result<impl IntoResponse, OAuthError> {
    let session = active_session(&state, session_id_from(&headers).as_deref()).await?;
    let Query(params) = query.map_err(|e| OAuthError::invalid_request(e.body_text()))?;
    let authorization_code = issue_code(&state, &session, &params).await?;
    Ok(no_store(Json(AuthorizeResponse { authorization_code })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; auth_session=from-cookie"),
        );
        assert_eq!(session_id_from(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTH_SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(session_id_from(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn no_session_source_yields_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_id_from(&headers), None);
    }
}
