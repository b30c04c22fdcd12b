//! Current-state feature store.

use crate::error::{CoreError, CoreResult};
use crate::feature::Feature;
use crate::geometry::BoundingBox;
use crate::types::FeatureId;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Holds the current state of every live feature, keyed by feature ID.
///
/// The store is a materialized projection of the delta log: the coordinator
/// updates both inside one commit, and [`crate::coordinator::Coordinator::recover`]
/// can rebuild this projection from the log alone.
///
/// Readers never observe a partially applied batch: all mutation happens
/// under the coordinator's commit lock, and each read method takes the
/// row map's read lock once.
pub struct FeatureStore {
    rows: RwLock<BTreeMap<FeatureId, Feature>>,
}

impl FeatureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the feature with the given ID.
    pub fn get(&self, id: FeatureId) -> CoreResult<Feature> {
        self.rows
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::FeatureNotFound { id })
    }

    /// Returns true if a feature with the given ID exists.
    #[must_use]
    pub fn contains(&self, id: FeatureId) -> bool {
        self.rows.read().contains_key(&id)
    }

    /// Inserts or replaces a feature row.
    pub fn upsert(&self, feature: Feature) {
        self.rows.write().insert(feature.id, feature);
    }

    /// Physically removes a feature row. No tombstone is kept.
    pub fn delete(&self, id: FeatureId) {
        self.rows.write().remove(&id);
    }

    /// Returns the features whose geometry intersects the bounding box.
    ///
    /// The result is a snapshot materialized at call time; it is finite and
    /// not restartable across mutation, so consumers must re-query after a
    /// commit.
    #[must_use]
    pub fn list_in_bbox(&self, bbox: &BoundingBox) -> Vec<Feature> {
        self.rows
            .read()
            .values()
            .filter(|f| f.geometry.intersects(bbox))
            .cloned()
            .collect()
    }

    /// Returns the number of live features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the store holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Applies a batch of row changes under one write lock.
    ///
    /// Readers serialize against this, so a concurrent bbox listing sees the
    /// rows either entirely before or entirely after the batch.
    pub(crate) fn apply(&self, upserts: Vec<Feature>, deletes: Vec<FeatureId>) {
        let mut rows = self.rows.write();
        for feature in upserts {
            rows.insert(feature.id, feature);
        }
        for id in deletes {
            rows.remove(&id);
        }
    }

    /// Removes every row. Used when rebuilding the projection from the log.
    pub(crate) fn clear(&self) {
        self.rows.write().clear();
    }
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeatureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
