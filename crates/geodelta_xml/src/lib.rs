//! # geodelta XML
//!
//! Minimal XML reading and writing for the geodelta legacy protocol.
//!
//! The legacy wire format is small, element-oriented XML (changeset
//! documents, edit uploads, map downloads). This crate provides exactly the
//! subset those documents use: an [`Element`] tree, a writer that escapes
//! the predefined entities, and a strict parser that resolves them.
//!
//! ## Usage
//!
//! ```
//! use geodelta_xml::{from_xml, to_xml, Element};
//!
//! let doc = Element::new("osm")
//!     .with_child(Element::new("changeset").with_attr("id", "1"));
//! let xml = to_xml(&doc);
//!
//! let parsed = from_xml(&xml).unwrap();
//! assert_eq!(parsed.first_child("changeset").unwrap().attr("id"), Some("1"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod element;
mod encoder;
mod error;

pub use decoder::from_xml;
pub use element::Element;
pub use encoder::{to_xml, to_xml_document};
pub use error::{XmlError, XmlResult};
