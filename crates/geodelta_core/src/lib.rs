//! # geodelta core
//!
//! Versioned geospatial feature storage with an append-only delta log.
//!
//! This crate provides:
//! - A current-state [`FeatureStore`] keyed by feature ID
//! - An immutable, append-only [`DeltaLog`] of committed changesets
//! - A [`Coordinator`] that commits batches of feature operations
//!   atomically under optimistic concurrency control
//! - A [`BoundsRegistry`] of named coverage polygons
//! - A [`UserLedger`] of credential records
//!
//! # Architecture
//!
//! The delta log is the source of truth for history; the feature store is a
//! derived, overwritable projection kept in lockstep inside the same commit.
//! The coordinator is the only writer of both. Protocol front-ends (native
//! JSON and the legacy XML layer) translate their wire formats into the one
//! internal [`Batch`] type and never duplicate validation logic.
//!
//! # Example
//!
//! ```
//! use geodelta_core::{Batch, BatchItem, Coordinator, DeltaLog, FeatureStore, Geometry,
//!     Properties, UserLedger};
//! use std::sync::Arc;
//!
//! let store = Arc::new(FeatureStore::new());
//! let log = Arc::new(DeltaLog::new());
//! let users = Arc::new(UserLedger::new());
//! let user = users.register("ingalls", "yeaheh", "ingalls@example.com").unwrap();
//!
//! let coordinator = Coordinator::new(store, log, users);
//! let batch = Batch::from_items(vec![BatchItem::create(
//!     Geometry::point(-77.0, 38.9),
//!     Properties::new(),
//! )]);
//! let outcome = coordinator.commit(user.id, Properties::new(), &batch).unwrap();
//! assert!(outcome.delta_id.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code must not use panic!/unwrap()/expect().
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod batch;
mod bounds;
mod coordinator;
mod delta;
mod error;
mod feature;
mod geometry;
mod store;
mod types;

pub use auth::{User, UserLedger};
pub use batch::{Action, Batch, BatchItem};
pub use bounds::BoundsRegistry;
pub use coordinator::{CommitOutcome, CommittedItem, Coordinator};
pub use delta::{Delta, DeltaLog, DeltaMetadata, SnapshotEntry};
pub use error::{CoreError, CoreResult};
pub use feature::{Feature, Properties};
pub use geometry::{BoundingBox, Geometry, Position};
pub use store::FeatureStore;
pub use types::{DeltaId, FeatureId, UserId, Version};
