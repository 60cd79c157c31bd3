//! Durable user identity and its email index.

use crate::store::Record;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

impl Record for User {
    const PREFIX: &'static str = "user";
}

/// `user_email:<email>` entry pointing at a user id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserEmail(pub String);

impl Record for UserEmail {
    const PREFIX: &'static str = "user_email";
}

/// Canonical form used for the email index.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_index_stores_bare_id() {
        assert_eq!(
            serde_json::to_string(&UserEmail("abc".into())).unwrap(),
            r#""abc""#
        );
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
    }
}
