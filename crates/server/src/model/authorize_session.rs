//! Authorization code record, consumed once at the token endpoint.

use crate::store::Record;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// The only PKCE transform accepted.
pub const PKCE_METHOD_S256: &str = "S256";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeSession {
    pub authorization_code: String,
    pub user_id: String,
    pub email: String,
    pub client_id: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub scope: String,
    pub redirect_uri: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

impl Record for AuthorizeSession {
    const PREFIX: &'static str = "authorize_session";
}

impl AuthorizeSession {
    /// Check the code was issued to this client for this redirect URI.
    pub fn is_bound_to(&self, client_id: &str, redirect_uri: &str) -> bool {
        self.client_id == client_id && self.redirect_uri == redirect_uri
    }

    /// Verify PKCE code verifier against stored challenge
    pub fn verify_pkce(&self, code_verifier: &str) -> bool {
        if self.code_challenge_method != PKCE_METHOD_S256 {
            return false;
        }
        constant_time_eq(
            s256_challenge(code_verifier).as_bytes(),
            self.code_challenge.as_bytes(),
        )
    }
}

/// `BASE64URL-ENCODE(SHA256(ASCII(code_verifier)))` per RFC 7636 §4.2.
pub fn s256_challenge(code_verifier: &str) -> String {
    let hash = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(challenge: &str, method: &str) -> AuthorizeSession {
        AuthorizeSession {
            authorization_code: "c".repeat(64),
            user_id: "u1".into(),
            email: "a@b.com".into(),
            client_id: "demo-store-1".into(),
            code_challenge: challenge.into(),
            code_challenge_method: method.into(),
            scope: "openid".into(),
            redirect_uri: "https://cb".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn s256_matches_rfc7636_appendix_b() {
        assert_eq!(
            s256_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn pkce_accepts_only_the_matching_verifier() {
        let r = record(&s256_challenge("verifier1"), PKCE_METHOD_S256);
        assert!(r.verify_pkce("verifier1"));
        assert!(!r.verify_pkce("verifier2"));
        assert!(!r.verify_pkce(""));
    }

    #[test]
    fn pkce_rejects_non_s256_records() {
        let r = record("verifier1", "plain");
        assert!(!r.verify_pkce("verifier1"));
    }

    #[test]
    fn binding_checks_client_and_redirect() {
        let r = record("x", PKCE_METHOD_S256);
        assert!(r.is_bound_to("demo-store-1", "https://cb"));
        assert!(!r.is_bound_to("demo-store-2", "https://cb"));
        assert!(!r.is_bound_to("demo-store-1", "https://cb/other"));
    }
}
