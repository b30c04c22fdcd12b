//! # geodelta testkit
//!
//! Test utilities for geodelta.
//!
//! This crate provides:
//! - Seeded coordinator fixtures and scenario helpers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use geodelta_testkit::prelude::*;
//!
//! with_coordinator(|fixture| {
//!     let outcome = fixture.commit(&shop_batch(3));
//!     assert!(outcome.delta_id.is_some());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
