//! Error types for geodelta core.

use crate::types::{DeltaId, FeatureId, Version};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in geodelta core operations.
///
/// Every validation error is detected before any write; there is no
/// partial-commit error class. A failed batch leaves the feature store and
/// the delta log untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A create or modify item is missing its geometry or properties.
    #[error("malformed feature: {message}")]
    MalformedFeature {
        /// Description of what is missing or invalid.
        message: String,
    },

    /// A modify carried a version that does not match the stored version.
    #[error("version conflict on feature {id}: expected {expected}, got {actual}")]
    VersionConflict {
        /// The feature whose version check failed.
        id: FeatureId,
        /// The version currently stored.
        expected: Version,
        /// The version supplied by the client.
        actual: Version,
    },

    /// A delete carried a version that does not match the stored version.
    ///
    /// Distinct from [`CoreError::VersionConflict`] because the wire layer
    /// reports deletes with a fixed message.
    #[error("delete version mismatch on feature {id}: expected {expected}, got {actual}")]
    DeleteVersionMismatch {
        /// The feature whose version check failed.
        id: FeatureId,
        /// The version currently stored.
        expected: Version,
        /// The version supplied by the client.
        actual: Version,
    },

    /// A modify or delete referenced a feature that does not exist.
    #[error("feature not found: {id}")]
    FeatureNotFound {
        /// The ID that was not found.
        id: FeatureId,
    },

    /// A delta lookup or finalize referenced an unknown delta.
    #[error("delta not found: {id}")]
    DeltaNotFound {
        /// The ID that was not found.
        id: DeltaId,
    },

    /// An upload targeted a delta that is already finalized.
    #[error("delta {id} is already finalized")]
    DeltaFinalized {
        /// The delta that was already finalized.
        id: DeltaId,
    },

    /// An upload targeted a delta opened by a different user.
    #[error("delta {id} is not owned by the requesting user")]
    DeltaNotOwned {
        /// The delta whose ownership check failed.
        id: DeltaId,
    },

    /// A bound lookup referenced an unknown name.
    #[error("bound not found: {name}")]
    BoundNotFound {
        /// The name that was not found.
        name: String,
    },

    /// A bound was registered with a non-polygon geometry.
    #[error("bound geometry must be a polygon: {name}")]
    InvalidBound {
        /// The name of the rejected bound.
        name: String,
    },

    /// A bound with this name already exists.
    #[error("duplicate key value violates unique constraint \"bounds_name_key\"")]
    DuplicateBound {
        /// The conflicting name.
        name: String,
    },

    /// A user with this username already exists.
    #[error("duplicate key value violates unique constraint \"users_username_key\"")]
    DuplicateUser {
        /// The conflicting username.
        username: String,
    },

    /// Username/password verification failed.
    #[error("invalid username or password")]
    BadCredentials,
}

impl CoreError {
    /// Creates a malformed feature error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFeature {
            message: message.into(),
        }
    }

    /// Creates a version conflict error.
    pub fn version_conflict(id: FeatureId, expected: Version, actual: Version) -> Self {
        Self::VersionConflict {
            id,
            expected,
            actual,
        }
    }

    /// Creates a delete version mismatch error.
    pub fn delete_mismatch(id: FeatureId, expected: Version, actual: Version) -> Self {
        Self::DeleteVersionMismatch {
            id,
            expected,
            actual,
        }
    }

    /// Creates a feature not found error.
    pub fn not_found(id: FeatureId) -> Self {
        Self::FeatureNotFound { id }
    }
}
