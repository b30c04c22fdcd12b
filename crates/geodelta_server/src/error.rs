//! Error types and wire responses for the feature server.

use geodelta_compat::CompatError;
use geodelta_core::CoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// A transport-agnostic response: a status code and a body string.
///
/// The HTTP routing shell is an external collaborator; handlers produce
/// these values and the shell writes them out verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// Response body, already serialized.
    pub body: String,
}

impl Response {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// The fixed success body for write operations.
    pub fn accepted() -> Self {
        Self::ok("true")
    }
}

/// Errors that can occur while handling a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServerError {
    /// A commit, lookup, or registration failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A legacy protocol translation failed.
    #[error(transparent)]
    Compat(#[from] CompatError),

    /// The request carried no credentials.
    #[error("authentication required")]
    MissingCredentials,

    /// The request carried credentials that did not verify.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request was structurally invalid for reasons outside the body.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ServerError {
    /// Maps the error to its wire response.
    ///
    /// Two distinct unauthorized shapes are load-bearing: missing
    /// credentials produce a structured JSON body, invalid credentials a
    /// plain-text one. Clients match on them.
    pub fn response(&self) -> Response {
        match self {
            Self::Core(core) => core_response(core),
            Self::Compat(CompatError::Core(core)) => core_response(core),
            Self::Compat(compat) => Response {
                status: 400,
                body: compat.to_string(),
            },
            Self::MissingCredentials => Response {
                status: 401,
                body: serde_json::json!({
                    "code": 401,
                    "reason": "You must be logged in to access this resource",
                    "status": "Not Authorized",
                })
                .to_string(),
            },
            Self::InvalidCredentials => Response {
                status: 401,
                body: "Not Authorized!".into(),
            },
            Self::InvalidRequest(message) => Response {
                status: 400,
                body: message.clone(),
            },
        }
    }
}

fn core_response(core: &CoreError) -> Response {
    let (status, body) = match core {
        CoreError::MalformedFeature { .. } => {
            (400, "Body must be valid GeoJSON Feature".to_string())
        }
        CoreError::DeleteVersionMismatch { .. } => (400, "Delete Version Mismatch".to_string()),
        CoreError::VersionConflict { .. } => (409, core.to_string()),
        CoreError::FeatureNotFound { .. }
        | CoreError::DeltaNotFound { .. }
        | CoreError::BoundNotFound { .. } => (404, core.to_string()),
        CoreError::DeltaFinalized { .. } | CoreError::DeltaNotOwned { .. } => {
            (409, core.to_string())
        }
        CoreError::DuplicateUser { .. }
        | CoreError::DuplicateBound { .. }
        | CoreError::InvalidBound { .. } => (400, core.to_string()),
        CoreError::BadCredentials => (401, "Not Authorized!".to_string()),
    };
    Response { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodelta_core::{FeatureId, Version};

    #[test]
    fn malformed_feature_has_fixed_body() {
        let err = ServerError::Core(CoreError::malformed("missing geometry"));
        let response = err.response();
        assert_eq!(response.status, 400);
        assert_eq!(response.body, "Body must be valid GeoJSON Feature");
    }

    #[test]
    fn stale_delete_has_fixed_body() {
        let err = ServerError::Core(CoreError::delete_mismatch(
            FeatureId::new(1),
            Version::new(2),
            Version::new(1),
        ));
        assert_eq!(err.response().body, "Delete Version Mismatch");
    }

    #[test]
    fn unauthorized_shapes_are_distinct() {
        let missing = ServerError::MissingCredentials.response();
        let invalid = ServerError::InvalidCredentials.response();

        assert_eq!(missing.status, 401);
        assert_eq!(invalid.status, 401);
        assert_ne!(missing.body, invalid.body);

        let parsed: serde_json::Value = serde_json::from_str(&missing.body).unwrap();
        assert_eq!(parsed["code"], 401);
        assert_eq!(parsed["status"], "Not Authorized");
        assert_eq!(invalid.body, "Not Authorized!");
    }

    #[test]
    fn duplicate_user_embeds_constraint() {
        let err = ServerError::Core(CoreError::DuplicateUser {
            username: "ingalls".into(),
        });
        let response = err.response();
        assert_eq!(response.status, 400);
        assert!(response.body.contains("users_username_key"));
    }

    #[test]
    fn nested_compat_core_errors_map_like_core_errors() {
        let err = ServerError::Compat(CompatError::Core(CoreError::not_found(FeatureId::new(9))));
        assert_eq!(err.response().status, 404);
    }
}
