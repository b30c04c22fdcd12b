//! Legacy XML protocol adapter.
//!
//! Translates the three-step legacy editing flow onto the native
//! transaction coordinator:
//!
//! 1. changeset create opens a delta and returns its ID,
//! 2. edit upload commits an `<osmChange>` batch into that delta and
//!    finalizes it,
//! 3. map download renders the point features inside a bounding box.
//!
//! A changeset is either open or finalized. Uploading into a finalized
//! changeset, or into one opened by another user, is rejected by the
//! coordinator. Coordinates on this path are narrowed to single precision;
//! the native path is unaffected.
//!
//! ```
//! use std::sync::Arc;
//!
//! use geodelta_compat::{create_changeset, map, parse_bbox, upload};
//! use geodelta_core::{Coordinator, DeltaLog, FeatureStore, UserLedger};
//!
//! let coordinator = Coordinator::new(
//!     Arc::new(FeatureStore::new()),
//!     Arc::new(DeltaLog::new()),
//!     Arc::new(UserLedger::new()),
//! );
//! let author = coordinator
//!     .users()
//!     .register("ingalls", "yeaheh", "ingalls@protonmail.com")
//!     .unwrap()
//!     .id;
//!
//! let delta = create_changeset(
//!     &coordinator,
//!     author,
//!     r#"<osm><changeset><tag k="comment" v="shops"/></changeset></osm>"#,
//! )
//! .unwrap();
//!
//! let diff = upload(
//!     &coordinator,
//!     author,
//!     delta,
//!     r#"<osmChange><create><node id="-1" lon="-77.03" lat="38.9">
//!         <tag k="shop" v="true"/>
//!     </node></create></osmChange>"#,
//! )
//! .unwrap();
//! assert!(diff.contains(r#"old_id="-1""#));
//!
//! let bbox = parse_bbox("-77.1,38.8,-77.0,39.0").unwrap();
//! let body = map(coordinator.store(), &bbox);
//! assert!(body.contains(r#"<tag k="shop" v="true"/>"#));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod changeset;
mod error;
mod map;
mod precision;
mod upload;

pub use changeset::{create_changeset, parse_changeset_metadata};
pub use error::{CompatError, CompatResult};
pub use map::{map, parse_bbox};
pub use precision::{reduce_coordinate, reduce_position};
pub use upload::{parse_upload, upload};
