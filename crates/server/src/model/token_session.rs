//! Refresh-token record.

use crate::store::Record;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenSession {
    pub user_id: String,
    pub client_id: String,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
    pub is_revoked: bool,
}

impl Record for TokenSession {
    const PREFIX: &'static str = "token_session";
}

impl TokenSession {
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Time left before the record expires, zero once past.
    pub fn remaining(&self) -> std::time::Duration {
        let left = self.expires_at - OffsetDateTime::now_utc();
        left.try_into().unwrap_or_default()
    }
}
