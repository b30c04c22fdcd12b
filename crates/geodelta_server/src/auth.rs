//! Request authorization.
//!
//! Credentials travel inline with each request; there are no sessions or
//! tokens. Write endpoints require a verified user, reads do not.

use crate::error::{ServerError, ServerResult};
use geodelta_core::{UserId, UserLedger};
use tracing::debug;

/// Inline username/password credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The username.
    pub username: String,
    /// The cleartext password, verified against the ledger's salted hash.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Resolves credentials to a verified user ID.
///
/// Absent credentials and failed verification are distinct errors with
/// distinct wire shapes.
pub fn authenticate(
    ledger: &UserLedger,
    credentials: Option<&Credentials>,
) -> ServerResult<UserId> {
    let credentials = credentials.ok_or(ServerError::MissingCredentials)?;
    match ledger.verify(&credentials.username, &credentials.password) {
        Ok(user) => Ok(user.id),
        Err(_) => {
            debug!(username = %credentials.username, "credential verification failed");
            Err(ServerError::InvalidCredentials)
        }
    }
}
