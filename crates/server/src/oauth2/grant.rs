//! Token endpoint.
//!
//! Exchanges an authorization code, or rotates a refresh token, for a token triple.
//!
//! The code exchange claims the authorization code with an atomic take before anything is
//! minted, so two concurrent exchanges of one code cannot both succeed and a consumed code
//! stays consumed even if a later step fails. With `revoke_rotated_refresh_tokens` enabled a
//! refresh token is claimed the same way before its successor is minted.

use crate::error::{ErrorResponse, OAuthError};
use crate::model::{AuthorizeSession, TokenSession};
use crate::oauth2::state::{OAuth2State, non_empty};
use crate::oauth2::{OAUTH2_TAG, no_store};
use crate::random::{SECRET_ID_BYTES, is_hex_id};
use crate::tokens::{self, Grant, TokenSet};
use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub code_verifier: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl From<TokenSet> for TokenResponse {
    fn from(set: TokenSet) -> Self {
        Self {
            id_token: set.id_token,
            access_token: set.access_token,
            refresh_token: set.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: set.expires_in,
        }
    }
}

/// Dispatch on `grant_type`.
pub async fn exchange(
    state: &OAuth2State,
    request: &TokenRequest,
) -> Result<TokenResponse, OAuthError> {
    match non_empty(request.grant_type.as_deref()) {
        Some(GRANT_AUTHORIZATION_CODE) => exchange_code(state, request).await,
        Some(GRANT_REFRESH_TOKEN) => refresh(state, request).await,
        Some(other) => Err(OAuthError::UnsupportedGrantType(format!(
            "grant_type '{other}' is not supported"
        ))),
        None => Err(OAuthError::invalid_request("grant_type is required")),
    }
}

async fn exchange_code(
    state: &OAuth2State,
    request: &TokenRequest,
) -> Result<TokenResponse, OAuthError> {
    let client_id = state.require_client(
        request.client_id.as_deref(),
        OAuthError::InvalidRequest,
        OAuthError::InvalidClient,
    )?;
    let redirect_uri = non_empty(request.redirect_uri.as_deref())
        .ok_or_else(|| OAuthError::invalid_request("redirect_uri is required"))?;
    let (Some(code), Some(code_verifier)) = (
        non_empty(request.code.as_deref()),
        non_empty(request.code_verifier.as_deref()),
    ) else {
        return Err(OAuthError::invalid_request(
            "code and code_verifier are required",
        ));
    };

    if !is_hex_id(code, SECRET_ID_BYTES) {
        return Err(OAuthError::invalid_grant("invalid authorization code"));
    }
    let Some(record) = state.authorize_sessions.get(code).await? else {
        tracing::warn!(%client_id, "unknown, expired or used authorization code");
        return Err(OAuthError::invalid_grant(
            "invalid or expired authorization code",
        ));
    };
    check_code_binding(&record, &client_id, redirect_uri, code_verifier)?;

    if state.authorize_sessions.take(code).await?.is_none() {
        tracing::warn!(%client_id, user_id = %record.user_id, "authorization code replayed");
        return Err(OAuthError::invalid_grant(
            "authorization code already used",
        ));
    }

    let set = tokens::mint(
        &state.keys,
        &state.config.issuer_url,
        &state.config.tokens,
        &Grant {
            user_id: &record.user_id,
            email: &record.email,
            client_id: &client_id,
            scope: &record.scope,
        },
    )?;
    persist_refresh_token(state, &record.user_id, &client_id, &record.scope, &set).await?;

    tracing::info!(user_id = %record.user_id, %client_id, "authorization code exchanged");
    Ok(set.into())
}

/// Client, redirect URI and PKCE verifier must all match what was authorized.
fn check_code_binding(
    record: &AuthorizeSession,
    client_id: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<(), OAuthError> {
    if !record.is_bound_to(client_id, redirect_uri) {
        tracing::warn!(
            %client_id,
            expected_client = %record.client_id,
            "authorization code presented with mismatched client or redirect_uri"
        );
        return Err(OAuthError::invalid_grant(
            "client_id or redirect_uri does not match the authorization request",
        ));
    }
    if !record.verify_pkce(code_verifier) {
        tracing::warn!(%client_id, "PKCE verification failed");
        return Err(OAuthError::invalid_grant("PKCE verification failed"));
    }
    Ok(())
}

async fn refresh(
    state: &OAuth2State,
    request: &TokenRequest,
) -> Result<TokenResponse, OAuthError> {
    let client_id = state.require_client(
        request.client_id.as_deref(),
        OAuthError::InvalidRequest,
        OAuthError::InvalidClient,
    )?;
    let presented = non_empty(request.refresh_token.as_deref())
        .ok_or_else(|| OAuthError::invalid_request("refresh_token is required"))?;

    let Some(previous) = state.token_sessions.get(presented).await? else {
        tracing::warn!(%client_id, "unknown refresh token");
        return Err(OAuthError::invalid_grant("invalid refresh token"));
    };
    if previous.is_revoked {
        tracing::warn!(%client_id, user_id = %previous.user_id, "revoked refresh token presented");
        return Err(OAuthError::invalid_grant("refresh token revoked"));
    }
    if previous.is_expired() {
        return Err(OAuthError::invalid_grant("refresh token expired"));
    }
    if previous.client_id != client_id {
        tracing::warn!(
            %client_id,
            owner = %previous.client_id,
            "refresh token presented by another client"
        );
        return Err(OAuthError::invalid_grant(
            "refresh token was not issued to this client",
        ));
    }

    let Some(user) = state.users.get(&previous.user_id).await? else {
        tracing::warn!(user_id = %previous.user_id, "refresh token for unknown user");
        return Err(OAuthError::invalid_grant("unknown user"));
    };
    if state.config.tokens.revoke_rotated_refresh_tokens {
        claim_for_rotation(state, presented, &client_id).await?;
    }

    let set = tokens::mint(
        &state.keys,
        &state.config.issuer_url,
        &state.config.tokens,
        &Grant {
            user_id: &user.id,
            email: &user.email,
            client_id: &client_id,
            scope: &previous.scope,
        },
    )?;
    persist_refresh_token(state, &user.id, &client_id, &previous.scope, &set).await?;

    tracing::info!(user_id = %user.id, %client_id, "refresh token rotated");
    Ok(set.into())
}

/// Take the presented refresh token out of the store and put it back marked revoked.
///
/// Only the caller whose take observes a live, unrevoked record may mint a successor.
async fn claim_for_rotation(
    state: &OAuth2State,
    presented: &str,
    client_id: &str,
) -> Result<(), OAuthError> {
    let Some(claimed) = state.token_sessions.take(presented).await? else {
        tracing::warn!(%client_id, "refresh token already rotated");
        return Err(OAuthError::invalid_grant("refresh token already used"));
    };
    let already_revoked = claimed.is_revoked;
    let revoked = TokenSession {
        is_revoked: true,
        ..claimed
    };
    state
        .token_sessions
        .save_with_ttl(presented, &revoked, Some(revoked.remaining()))
        .await?;

    if already_revoked {
        tracing::warn!(%client_id, user_id = %revoked.user_id, "revoked refresh token presented");
        return Err(OAuthError::invalid_grant("refresh token revoked"));
    }
    Ok(())
}

async fn persist_refresh_token(
    state: &OAuth2State,
    user_id: &str,
    client_id: &str,
    scope: &str,
    set: &TokenSet,
) -> Result<(), OAuthError> {
    let record = TokenSession {
        user_id: user_id.to_string(),
        client_id: client_id.to_string(),
        refresh_token: set.refresh_token.clone(),
        scope: scope.to_string(),
        created_at: set.issued_at,
        expires_at: set.refresh_expires_at,
        is_revoked: false,
    };
    state.token_sessions.save(&set.refresh_token, &record).await?;
    Ok(())
}

/// OAuth2 Token endpoint.
#[tracing::instrument(skip(state, form))]
#[utoipa::path(
    post,
    path = "/token",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Token",
    summary = "Exchange authorization code or refresh token for tokens",
    description = "Issues an ID token, access token and refresh token.\n\n\
                   **Supported grant types:**\n\
                   - `authorization_code`: requires `code`, `code_verifier`, `redirect_uri`, `client_id`\n\
                   - `refresh_token`: requires `refresh_token`, `client_id`; returns a new refresh token\n\n\
                   Authorization codes are single-use.",
    request_body(
        content = TokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token request parameters"
    ),
    responses(
        (status = 200, description = "Tokens issued successfully", body = TokenResponse),
        (status = 400, description = "invalid_request, invalid_client, invalid_grant or unsupported_grant_type", body = ErrorResponse),
        (status = 500, description = "Store or signing failure", body = ErrorResponse),
    )
)]
pub async fn token(
    State(state): State<OAuth2State>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<impl IntoResponse, OAuthError> {
    let Form(request) = form.map_err(|e| OAuthError::invalid_request(e.body_text()))?;
    let response = exchange(&state, &request).await?;
    Ok(no_store(Json(response)))
}
