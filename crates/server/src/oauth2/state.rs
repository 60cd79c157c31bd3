//! OAuth2 state management.
//!
//! Provides the state shared by every issuance endpoint.

use crate::config::AppConfig;
use crate::credentials::CredentialVerifier;
use crate::error::OAuthError;
use crate::keys::SigningKeys;
use crate::model::{AuthSession, AuthorizeSession, TokenSession};
use crate::store::{RecordStore, SessionStore};
use crate::users::UserDirectory;
use std::sync::Arc;

/// OAuth2 state containing all components needed for the authorization server.
#[derive(Clone)]
pub struct OAuth2State {
    pub config: Arc<AppConfig>,
    pub keys: Arc<SigningKeys>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub users: UserDirectory,
    pub auth_sessions: RecordStore<AuthSession>,
    pub authorize_sessions: RecordStore<AuthorizeSession>,
    pub token_sessions: RecordStore<TokenSession>,
}

impl OAuth2State {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn SessionStore>,
        keys: Arc<SigningKeys>,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let tokens = &config.tokens;
        Self {
            users: UserDirectory::new(store.clone()),
            auth_sessions: RecordStore::new(store.clone(), Some(tokens.auth_session_ttl())),
            authorize_sessions: RecordStore::new(
                store.clone(),
                Some(tokens.authorization_code_ttl()),
            ),
            token_sessions: RecordStore::new(store, Some(tokens.refresh_token_ttl())),
            config,
            keys,
            credentials,
        }
    }

    /// Fail unless `client_id` is present and registered.
    ///
    /// A missing value is `missing`, an unknown one is `unknown`.
    pub fn require_client(
        &self,
        client_id: Option<&str>,
        missing: fn(String) -> OAuthError,
        unknown: fn(String) -> OAuthError,
    ) -> Result<String, OAuthError> {
        let client_id = non_empty(client_id).ok_or_else(|| missing("client_id is required".into()))?;
        if !self.config.is_registered_client(client_id) {
            tracing::warn!(%client_id, "unregistered client");
            return Err(unknown(format!("unknown client_id '{client_id}'")));
        }
        Ok(client_id.to_string())
    }
}

/// `Some` only for values with non-whitespace content.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
