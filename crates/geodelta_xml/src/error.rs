//! Error types for the XML crate.

use thiserror::Error;

/// Result type for XML operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Errors that can occur while reading XML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// Input ended in the middle of a tag or entity.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The document is not well formed.
    #[error("malformed XML: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },

    /// A closing tag did not match the open element.
    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        /// The element that was open.
        expected: String,
        /// The closing tag that was found.
        found: String,
    },

    /// An entity reference was not recognized.
    #[error("unknown entity reference: &{entity};")]
    UnknownEntity {
        /// The entity name.
        entity: String,
    },

    /// The document contained no root element.
    #[error("document has no root element")]
    NoRootElement,
}

impl XmlError {
    /// Creates a malformed document error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
