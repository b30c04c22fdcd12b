//! Named coverage polygons.

use crate::error::{CoreError, CoreResult};
use crate::feature::Feature;
use crate::geometry::Geometry;
use crate::store::FeatureStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Registry of named coverage polygons used to scope editable regions.
///
/// Bounds are a scoping and tagging mechanism: registering a bound does not
/// cause writes outside it to be rejected. They partition which features
/// belong to a named region for read-side queries.
pub struct BoundsRegistry {
    bounds: RwLock<BTreeMap<String, Geometry>>,
}

impl BoundsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bounds: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a named polygon.
    ///
    /// Rejects non-polygon geometries and duplicate names.
    pub fn create(&self, name: impl Into<String>, polygon: Geometry) -> CoreResult<()> {
        let name = name.into();
        if !matches!(polygon, Geometry::Polygon { .. }) {
            return Err(CoreError::InvalidBound { name });
        }

        let mut bounds = self.bounds.write();
        if bounds.contains_key(&name) {
            return Err(CoreError::DuplicateBound { name });
        }
        bounds.insert(name, polygon);
        Ok(())
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.bounds.read().keys().cloned().collect()
    }

    /// Returns the polygon registered under a name.
    pub fn get(&self, name: &str) -> CoreResult<Geometry> {
        self.bounds
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::BoundNotFound { name: name.into() })
    }

    /// Returns the features whose geometry falls within the named bound.
    ///
    /// Membership is decided by bounding-box overlap, the same capability
    /// the store's bbox listing uses.
    pub fn features_in(&self, name: &str, store: &FeatureStore) -> CoreResult<Vec<Feature>> {
        let polygon = self.get(name)?;
        let bbox = polygon
            .bbox()
            .ok_or_else(|| CoreError::InvalidBound { name: name.into() })?;
        Ok(store.list_in_bbox(&bbox))
    }

    /// Returns the number of registered bounds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bounds.read().len()
    }

    /// Returns true if no bound is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.read().is_empty()
    }
}

impl Default for BoundsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
