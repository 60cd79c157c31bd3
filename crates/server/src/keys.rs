//! Process-lifetime RSA signing key.
//!
//! One [`SigningKeys`] is created at start-up and shared by reference with everything that
//! signs or verifies tokens. Its `kid` is derived from the public key, so token headers and
//! the published JWKS always agree.

use crate::error::KeyError;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::jwk::{
    AlgorithmParameters, CommonParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
    RSAKeyParameters, RSAKeyType,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::EncodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

pub const RSA_KEY_BITS: usize = 2048;
const KID_LEN: usize = 16;
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

pub struct SigningKeys {
    kid: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    n: String,
    e: String,
}

impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeys")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl SigningKeys {
    /// Generate a fresh RSA-2048 key pair.
    pub fn generate() -> Result<Self, KeyError> {
        let mut rng = rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| KeyError::Generation(e.to_string()))?;
        Self::from_private_key(private_key)
    }

    /// Load a PKCS#1 PEM private key, e.g. a fixed key for tests.
    pub fn from_pkcs1_pem(pem: &str) -> Result<Self, KeyError> {
        let private_key =
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| KeyError::Encoding(e.to_string()))?;
        Self::from_private_key(private_key)
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Result<Self, KeyError> {
        let public_key = RsaPublicKey::from(&private_key);

        let private_der = private_key
            .to_pkcs1_der()
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        let encoding = EncodingKey::from_rsa_der(private_der.as_bytes());

        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
        let decoding = DecodingKey::from_rsa_components(&n, &e).map_err(KeyError::Verification)?;

        Ok(Self {
            kid: derive_kid(&public_key)?,
            encoding,
            decoding,
            n,
            e,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign `claims` as an RS256 compact JWT carrying this key's `kid`.
    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, KeyError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding).map_err(KeyError::Signing)
    }

    /// The public half as a single-entry key set.
    pub fn jwks(&self) -> JwkSet {
        JwkSet {
            keys: vec![Jwk {
                common: CommonParameters {
                    public_key_use: Some(PublicKeyUse::Signature),
                    key_algorithm: Some(KeyAlgorithm::RS256),
                    key_id: Some(self.kid.clone()),
                    ..Default::default()
                },
                algorithm: AlgorithmParameters::RSA(RSAKeyParameters {
                    key_type: RSAKeyType::RSA,
                    n: self.n.clone(),
                    e: self.e.clone(),
                }),
            }],
        }
    }

    /// Read back a token issued by this key.
    ///
    /// Only RSA algorithms are accepted; `exp`, `iat` and `sub` must be present. The
    /// audience is checked only when `audience` is given.
    pub fn verify<C: DeserializeOwned>(
        &self,
        token: &str,
        audience: Option<&str>,
    ) -> Result<C, KeyError> {
        let header = jsonwebtoken::decode_header(token).map_err(KeyError::Verification)?;
        if !RSA_ALGORITHMS.contains(&header.alg) {
            return Err(KeyError::UnsupportedAlgorithm(header.alg));
        }
        if header.kid.as_deref().is_some_and(|kid| kid != self.kid) {
            return Err(KeyError::Verification(
                jsonwebtoken::errors::ErrorKind::InvalidToken.into(),
            ));
        }

        let mut validation = Validation::new(header.alg);
        validation.algorithms = RSA_ALGORITHMS.to_vec();
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        jsonwebtoken::decode::<C>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(KeyError::Verification)
    }
}

/// First 16 chars of base64url(SHA-256(SubjectPublicKeyInfo DER)).
fn derive_kid(public_key: &RsaPublicKey) -> Result<String, KeyError> {
    let spki = public_key
        .to_public_key_der()
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    let digest = URL_SAFE_NO_PAD.encode(Sha256::digest(spki.as_bytes()));
    Ok(digest[..KID_LEN].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use serde::Deserialize;
    use time::OffsetDateTime;

    static KEYS: Lazy<SigningKeys> = Lazy::new(|| SigningKeys::generate().unwrap());

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Claims {
        sub: String,
        aud: String,
        iat: i64,
        exp: i64,
    }

    fn claims(exp_offset: i64) -> Claims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Claims {
            sub: "user-1".into(),
            aud: "demo-store-1".into(),
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn signed_tokens_carry_the_published_kid() {
        let token = KEYS.sign(&claims(3600)).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(KEYS.kid()));

        let jwks = KEYS.jwks();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].common.key_id.as_deref(), Some(KEYS.kid()));
        assert_eq!(KEYS.kid().len(), 16);
    }

    #[test]
    fn jwks_serializes_as_rsa_sig_key() {
        let value = serde_json::to_value(KEYS.jwks()).unwrap();
        let key = &value["keys"][0];
        assert_eq!(key["kty"], "RSA");
        assert_eq!(key["alg"], "RS256");
        assert_eq!(key["use"], "sig");
        assert_eq!(key["e"], "AQAB");
        assert!(key.get("d").is_none());
    }

    #[test]
    fn verify_round_trips_and_checks_audience() {
        let original = claims(3600);
        let token = KEYS.sign(&original).unwrap();

        let decoded: Claims = KEYS.verify(&token, None).unwrap();
        assert_eq!(decoded, original);
        assert!(KEYS.verify::<Claims>(&token, Some("demo-store-1")).is_ok());
        assert!(KEYS.verify::<Claims>(&token, Some("demo-store-2")).is_err());
    }

    #[test]
    fn verify_rejects_expired_and_tampered_tokens() {
        let expired = KEYS.sign(&claims(-3600)).unwrap();
        assert!(matches!(
            KEYS.verify::<Claims>(&expired, None),
            Err(KeyError::Verification(_))
        ));

        let token = KEYS.sign(&claims(3600)).unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"admin","iat":0,"exp":9999999999}"#);
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;
        assert!(KEYS.verify::<Claims>(&parts.join("."), None).is_err());
    }

    #[test]
    fn verify_rejects_non_rsa_algorithms() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims(3600),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(
            KEYS.verify::<Claims>(&token, None),
            Err(KeyError::UnsupportedAlgorithm(Algorithm::HS256))
        ));
    }

    #[test]
    fn verify_requires_subject() {
        #[derive(Serialize)]
        struct NoSub {
            iat: i64,
            exp: i64,
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let token = KEYS.sign(&NoSub { iat: now, exp: now + 60 }).unwrap();
        assert!(KEYS.verify::<serde_json::Value>(&token, None).is_err());
    }

    #[test]
    fn tokens_from_another_key_are_rejected() {
        let other = SigningKeys::generate().unwrap();
        let token = other.sign(&claims(3600)).unwrap();
        assert!(KEYS.verify::<Claims>(&token, None).is_err());
    }
}
