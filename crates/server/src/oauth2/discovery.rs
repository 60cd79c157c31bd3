//! Key publication and OpenID Connect discovery.

use crate::oauth2::{OAUTH2_TAG, state::OAuth2State};
use axum::{Json, extract::State};
use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OpenIdConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub revocation_endpoint: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
    pub claims_supported: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl OpenIdConfiguration {
    pub fn for_issuer(issuer: &str) -> Self {
        let base = issuer.trim_end_matches('/');
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{base}/api/oauth/authorize"),
            token_endpoint: format!("{base}/api/oauth/token"),
            userinfo_endpoint: format!("{base}/api/oauth/userinfo"),
            revocation_endpoint: format!("{base}/api/oauth/revoke"),
            jwks_uri: format!("{base}/.well-known/jwks.json"),
            response_types_supported: strings(&["code"]),
            grant_types_supported: strings(&["authorization_code", "refresh_token"]),
            subject_types_supported: strings(&["public"]),
            id_token_signing_alg_values_supported: strings(&["RS256"]),
            scopes_supported: strings(&["openid", "email"]),
            token_endpoint_auth_methods_supported: strings(&["none"]),
            code_challenge_methods_supported: strings(&["S256"]),
            claims_supported: strings(&["iss", "sub", "aud", "iat", "exp", "email"]),
        }
    }
}

/// JSON Web Key Set with the current signing key.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    tag = OAUTH2_TAG,
    operation_id = "JWKS",
    summary = "Public signing keys",
    description = "Returns the RSA public key used to sign every issued token. The `kid` of the single \
                   entry matches the `kid` header of all tokens issued by this process.",
    responses(
        (status = 200, description = "JSON Web Key Set", content_type = "application/json")
    )
)]
pub async fn jwks(State(state): State<OAuth2State>) -> Json<JwkSet> {
    Json(state.keys.jwks())
}

/// OpenID Connect Discovery document.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/.well-known/openid-configuration",
    tag = OAUTH2_TAG,
    operation_id = "OpenID Connect Discovery",
    summary = "OpenID Connect Discovery document",
    description = "Returns the provider metadata: endpoint URLs, supported grant and response types, \
                   signing algorithms and PKCE methods.",
    responses(
        (status = 200, description = "OpenID Connect configuration document", body = OpenIdConfiguration),
    )
)]
pub async fn openid_configuration(State(state): State<OAuth2State>) -> Json<OpenIdConfiguration> {
    Json(OpenIdConfiguration::for_issuer(&state.config.issuer_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hang_off_the_issuer() {
        let doc = OpenIdConfiguration::for_issuer("https://auth.example.com/");
        assert_eq!(doc.issuer, "https://auth.example.com/");
        assert_eq!(
            doc.token_endpoint,
            "https://auth.example.com/api/oauth/token"
        );
        assert_eq!(
            doc.jwks_uri,
            "https://auth.example.com/.well-known/jwks.json"
        );
        assert_eq!(doc.code_challenge_methods_supported, vec!["S256"]);
    }
}
