//! Error types for the legacy protocol adapter.

use geodelta_core::CoreError;
use geodelta_xml::XmlError;
use thiserror::Error;

/// Result type for adapter operations.
pub type CompatResult<T> = Result<T, CompatError>;

/// Errors that can occur while translating the legacy XML protocol.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompatError {
    /// The underlying commit or lookup failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body was not well-formed XML.
    #[error("invalid XML body: {0}")]
    Xml(#[from] XmlError),

    /// The document's root element was not the expected one.
    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot {
        /// The root element the protocol expects.
        expected: String,
        /// The root element that was found.
        found: String,
    },

    /// The upload contained an element this projection cannot represent.
    #[error("unsupported element <{name}> in upload")]
    UnsupportedElement {
        /// The element name.
        name: String,
    },

    /// A required attribute was absent.
    #[error("element <{element}> is missing attribute \"{attribute}\"")]
    MissingAttribute {
        /// The element name.
        element: String,
        /// The attribute name.
        attribute: String,
    },

    /// An attribute value failed to parse as a number.
    #[error("invalid numeric value \"{value}\" for attribute \"{attribute}\"")]
    InvalidNumber {
        /// The attribute name.
        attribute: String,
        /// The raw value.
        value: String,
    },

    /// A bounding box parameter was not `west,south,east,north`.
    #[error("invalid bbox: {0}")]
    InvalidBbox(String),
}

impl CompatError {
    /// Creates a missing attribute error.
    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates an invalid number error.
    pub fn invalid_number(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}
