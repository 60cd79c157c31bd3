//! Records persisted through the session store.
//!
//! Each kind owns its key prefix via [`Record`](crate::store::Record); expiry policy is
//! attached when the owning [`RecordStore`](crate::store::RecordStore) is built.

pub mod auth_session;
pub mod authorize_session;
pub mod token_session;
pub mod user;

pub use auth_session::AuthSession;
pub use authorize_session::AuthorizeSession;
pub use token_session::TokenSession;
pub use user::{User, UserEmail};

/// True when the space-separated `scope` contains `wanted`.
pub fn has_scope(scope: &str, wanted: &str) -> bool {
    scope.split_whitespace().any(|s| s == wanted)
}
