//! Authenticated browser session created at login.

use crate::random::{SECRET_ID_BYTES, is_hex_id};
use crate::store::Record;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub session_id: String,
    pub user_id: String,
    pub email: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
    pub is_logged_in: bool,
}

impl Record for AuthSession {
    const PREFIX: &'static str = "auth_session";
}

impl AuthSession {
    /// Session ids are 32 random bytes, hex encoded.
    pub fn is_well_formed_id(session_id: &str) -> bool {
        is_hex_id(session_id, SECRET_ID_BYTES)
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
