//! Claim sets and minting of the ID / access / refresh token triple.

use crate::config::TokenConfig;
use crate::error::OAuthError;
use crate::keys::SigningKeys;
use crate::random::{SECRET_ID_BYTES, random_hex};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const REFRESH_TOKEN_USE: &str = "refresh";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub client_id: String,
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_use: String,
}

/// Who the tokens are issued to and for which client.
#[derive(Clone, Debug)]
pub struct Grant<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub client_id: &'a str,
    pub scope: &'a str,
}

#[derive(Clone, Debug)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub issued_at: OffsetDateTime,
    pub refresh_expires_at: OffsetDateTime,
}

/// Sign a fresh token triple for `grant`.
pub fn mint(
    keys: &SigningKeys,
    issuer: &str,
    lifetimes: &TokenConfig,
    grant: &Grant<'_>,
) -> Result<TokenSet, OAuthError> {
    let issued_at = OffsetDateTime::now_utc();
    let iat = issued_at.unix_timestamp();
    let access_exp = iat + seconds(lifetimes.access_token_lifetime);
    let refresh_expires_at = issued_at + lifetimes.refresh_token_ttl();

    let id_token = keys.sign(&IdTokenClaims {
        iss: issuer.to_string(),
        sub: grant.user_id.to_string(),
        aud: grant.client_id.to_string(),
        iat,
        exp: access_exp,
        email: grant.email.to_string(),
    })?;

    let access_token = keys.sign(&AccessTokenClaims {
        iss: issuer.to_string(),
        sub: grant.user_id.to_string(),
        aud: grant.client_id.to_string(),
        client_id: grant.client_id.to_string(),
        scope: grant.scope.to_string(),
        iat,
        exp: access_exp,
        jti: random_hex(SECRET_ID_BYTES)?,
    })?;

    let refresh_token = keys.sign(&RefreshTokenClaims {
        iss: issuer.to_string(),
        sub: grant.user_id.to_string(),
        aud: grant.client_id.to_string(),
        iat,
        exp: refresh_expires_at.unix_timestamp(),
        jti: random_hex(SECRET_ID_BYTES)?,
        token_use: REFRESH_TOKEN_USE.to_string(),
    })?;

    Ok(TokenSet {
        id_token,
        access_token,
        refresh_token,
        expires_in: lifetimes.access_token_lifetime,
        issued_at,
        refresh_expires_at,
    })
}

fn seconds(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
