//! User registration and credential verification.

use crate::error::{CoreError, CoreResult};
use crate::feature::Properties;
use crate::types::UserId;
use parking_lot::RwLock;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A registered user.
///
/// Users are created once via [`UserLedger::register`] and never mutated
/// afterwards. The password credential is stored as a salted SHA-256 digest,
/// never in cleartext.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique identity.
    pub id: UserId,
    /// Unique username.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Open key-value metadata.
    pub meta: Properties,
    salt: [u8; 16],
    password_hash: [u8; 32],
}

impl User {
    /// Verifies a cleartext password against the stored digest.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }
}

fn hash_password(salt: &[u8; 16], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Credential records consulted before any mutating operation.
///
/// The transaction coordinator requires a verified user as a precondition;
/// unauthenticated or mis-authenticated calls never reach validation.
pub struct UserLedger {
    users: RwLock<LedgerState>,
}

struct LedgerState {
    by_id: Vec<User>,
    by_username: HashMap<String, UserId>,
}

impl UserLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(LedgerState {
                by_id: Vec::new(),
                by_username: HashMap::new(),
            }),
        }
    }

    /// Registers a new user.
    ///
    /// Fails with a uniqueness-violation error if the username is taken;
    /// the ledger then still contains exactly one row for that username.
    pub fn register(
        &self,
        username: impl Into<String>,
        password: &str,
        email: impl Into<String>,
    ) -> CoreResult<User> {
        let username = username.into();
        let mut state = self.users.write();

        if state.by_username.contains_key(&username) {
            return Err(CoreError::DuplicateUser { username });
        }

        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);

        let user = User {
            id: UserId::new(state.by_id.len() as u64 + 1),
            username: username.clone(),
            email: email.into(),
            meta: Properties::new(),
            salt,
            password_hash: hash_password(&salt, password),
        };
        state.by_username.insert(username, user.id);
        state.by_id.push(user.clone());
        Ok(user)
    }

    /// Verifies a username/password pair.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub fn verify(&self, username: &str, password: &str) -> CoreResult<User> {
        let state = self.users.read();
        let user = state
            .by_username
            .get(username)
            .and_then(|id| state.by_id.get(id.as_u64() as usize - 1))
            .ok_or(CoreError::BadCredentials)?;

        if user.verify_password(password) {
            Ok(user.clone())
        } else {
            Err(CoreError::BadCredentials)
        }
    }

    /// Returns true if a user with this ID exists.
    #[must_use]
    pub fn contains(&self, id: UserId) -> bool {
        let state = self.users.read();
        id.as_u64() >= 1 && (id.as_u64() as usize) <= state.by_id.len()
    }

    /// Returns the number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().by_id.len()
    }

    /// Returns true if no user is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().by_id.is_empty()
    }
}

impl Default for UserLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLedger")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
