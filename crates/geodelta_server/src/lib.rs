//! # geodelta server
//!
//! Transport-agnostic request handlers for the geodelta feature server.
//!
//! This crate provides:
//! - the native GeoJSON API (feature reads and writes, batches),
//! - user registration and the inline-credential authorization contract,
//! - bounds and delta read endpoints,
//! - the legacy XML endpoints (changeset create, edit upload, map download).
//!
//! # Architecture
//!
//! Handlers take decoded request values and return [`Response`] values
//! holding a status code and a serialized body. An HTTP routing shell is an
//! external collaborator that maps routes and methods onto
//! [`GeoServer`]'s methods and writes the responses out verbatim.
//!
//! Both protocol paths share one [`geodelta_core::Coordinator`], so native
//! and legacy edits interleave under the same commit lock and land in the
//! same delta log.
//!
//! # Authorization
//!
//! Write endpoints require inline username/password credentials. The two
//! failure shapes are distinct and exact: missing credentials produce a
//! structured JSON body, invalid credentials a plain-text one.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod geojson;
mod handler;
mod server;

pub use auth::{authenticate, Credentials};
pub use config::ServerConfig;
pub use error::{Response, ServerError, ServerResult};
pub use geojson::{collection_json, feature_json, parse_collection, parse_feature};
pub use handler::{HandlerContext, RequestHandler};
pub use server::GeoServer;
