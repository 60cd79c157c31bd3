//! Token revocation endpoint (RFC 7009).

use crate::error::{ErrorResponse, OAuthError};
use crate::oauth2::OAUTH2_TAG;
use crate::oauth2::state::{OAuth2State, non_empty};
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RevokeRequest {
    pub token: Option<String>,
    /// Accepted and ignored; only refresh tokens are stateful.
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
}

/// Delete the refresh token record if it belongs to the caller.
///
/// Unknown tokens and tokens of other clients are left alone and reported exactly like a
/// successful revocation.
pub async fn revoke_token(state: &OAuth2State, request: &RevokeRequest) -> Result<(), OAuthError> {
    let token = non_empty(request.token.as_deref())
        .ok_or_else(|| OAuthError::invalid_request("token is required"))?;
    let client_id = state.require_client(
        request.client_id.as_deref(),
        OAuthError::InvalidClient,
        OAuthError::InvalidClient,
    )?;

    match state.token_sessions.get(token).await? {
        Some(record) if record.client_id == client_id => {
            state.token_sessions.delete(token).await?;
            tracing::info!(user_id = %record.user_id, %client_id, "refresh token revoked");
        }
        Some(record) => {
            tracing::warn!(%client_id, owner = %record.client_id, "revocation by non-owning client ignored");
        }
        None => {
            tracing::debug!(%client_id, "revocation of unknown token");
        }
    }
    Ok(())
}

/// Token revocation endpoint.
#[tracing::instrument(skip(state, form))]
#[utoipa::path(
    post,
    path = "/revoke",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Revoke Token",
    summary = "Revoke a refresh token",
    description = "Revokes a refresh token issued to the calling client. Implements RFC 7009.\n\n\
                   **Behavior:**\n\
                   - Returns 200 OK with an empty body whether the token was revoked, already revoked, \
                   issued to another client or never existed\n\
                   - `token_type_hint` is accepted and ignored",
    request_body(
        content = RevokeRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token revocation request"
    ),
    responses(
        (status = 200, description = "Request processed"),
        (status = 400, description = "Missing token or unknown client", body = ErrorResponse),
    )
)]
pub async fn revoke(
    State(state): State<OAuth2State>,
    form: Result<Form<RevokeRequest>, FormRejection>,
) -> Result<StatusCode, OAuthError> {
    let Form(request) = form.map_err(|e| OAuthError::invalid_request(e.body_text()))?;
    revoke_token(&state, &request).await?;
    Ok(StatusCode::OK)
}
