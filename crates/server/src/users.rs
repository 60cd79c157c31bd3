//! User directory: durable `email <-> user id` mapping.

use crate::error::StoreError;
use crate::model::user::normalize_email;
use crate::model::{User, UserEmail};
use crate::random::{USER_ID_BYTES, random_hex};
use crate::store::{RecordStore, SessionStore};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct UserDirectory {
    users: RecordStore<User>,
    emails: RecordStore<UserEmail>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            users: RecordStore::new(store.clone(), None),
            emails: RecordStore::new(store, None),
        }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.users.get(user_id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        match self.emails.get(&normalize_email(email)).await? {
            Some(UserEmail(id)) => self.users.get(&id).await,
            None => Ok(None),
        }
    }

    /// Resolve the user for `email`, creating it on first sight.
    ///
    /// Concurrent first logins for the same email converge on one id: the email index is
    /// claimed with insert-if-absent and the loser discards its own record.
    pub async fn get_or_create(&self, email: &str) -> Result<User, StoreError> {
        let email = normalize_email(email);
        if let Some(user) = self.find_by_email(&email).await? {
            return Ok(user);
        }

        let user = User {
            id: random_hex(USER_ID_BYTES)?,
            email: email.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.save(&user.id, &user).await?;

        if self
            .emails
            .insert_if_absent(&email, &UserEmail(user.id.clone()))
            .await?
        {
            tracing::info!(user_id = %user.id, "created user");
            return Ok(user);
        }

        self.users.delete(&user.id).await?;
        self.find_by_email(&email).await?.ok_or_else(|| {
            StoreError::Backend(format!("email index for {email} points at a missing user"))
        })
    }
}
