//! OAuth2 / OpenID Connect issuance server.
//!
//! Implements the Authorization Code grant with PKCE, ID tokens, refresh-token rotation,
//! RFC 7009 revocation and JWKS publication for a fixed set of registered public clients.
//! All protocol state lives in a TTL-keyed [`store::SessionStore`].

use std::sync::Arc;

use crate::config::AppConfig;
use crate::credentials::Argon2Credentials;
use crate::keys::SigningKeys;
use crate::oauth2::OAuth2State;

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod keys;
pub mod model;
pub mod oauth2;
pub mod random;
pub mod store;
pub mod tokens;
pub mod users;

/// Assemble the issuance state from configuration: open the store, generate the signing
/// key and load the credential table.
pub async fn build_state(config: AppConfig) -> color_eyre::Result<OAuth2State> {
    let store = store::connect(&config.store).await?;
    let keys = SigningKeys::generate()?;
    tracing::info!(kid = %keys.kid(), "signing key generated");

    let credentials = Argon2Credentials::new(&config.users);
    if credentials.is_empty() {
        tracing::warn!("no users configured, every login will be rejected");
    }

    Ok(OAuth2State::new(
        Arc::new(config),
        store,
        Arc::new(keys),
        Arc::new(credentials),
    ))
}
