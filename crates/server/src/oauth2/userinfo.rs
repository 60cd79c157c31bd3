//! OpenID Connect UserInfo endpoint.

use crate::error::{ErrorResponse, OAuthError};
use crate::oauth2::{OAUTH2_TAG, state::OAuth2State};
use crate::tokens::AccessTokenClaims;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserInfoResponse {
    pub sub: String,
    pub email: String,
}

/// Resolve the user behind a bearer access token.
pub async fn user_info(state: &OAuth2State, bearer: &str) -> Result<UserInfoResponse, OAuthError> {
    let claims: AccessTokenClaims = state.keys.verify(bearer, None).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        OAuthError::InvalidToken("access token is invalid or expired".into())
    })?;
    if claims.iss != state.config.issuer_url {
        return Err(OAuthError::InvalidToken("token issued by another issuer".into()));
    }

    let Some(user) = state.users.get(&claims.sub).await? else {
        return Err(OAuthError::InvalidToken("unknown subject".into()));
    };
    Ok(UserInfoResponse {
        sub: user.id,
        email: user.email,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

#[tracing::instrument(skip(state, headers))]
#[utoipa::path(
    get,
    path = "/userinfo",
    tag = OAUTH2_TAG,
    operation_id = "OpenID Connect UserInfo",
    summary = "Get the authenticated user's claims",
    description = "Returns `sub` and `email` for the user the access token was issued to.\n\n\
                   **Authentication:** Include the access token as a Bearer token in the Authorization header.",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User claims", body = UserInfoResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
    )
)]
pub async fn userinfo(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
) -> Result<Json<UserInfoResponse>, OAuthError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| OAuthError::InvalidToken("missing bearer token".into()))?;
    Ok(Json(user_info(&state, token).await?))
}
