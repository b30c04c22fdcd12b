//! Stored feature rows.

use crate::geometry::Geometry;
use crate::types::{DeltaId, FeatureId, Version};
use serde::{Deserialize, Serialize};

/// Free-form feature properties.
///
/// Properties are replaced wholesale on modification, never merged.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A current-state feature row.
///
/// Features are owned exclusively by the [`FeatureStore`]; deleted rows are
/// physically removed, and their history survives only inside the delta log.
///
/// [`FeatureStore`]: crate::store::FeatureStore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Store-assigned identity, never reused.
    pub id: FeatureId,
    /// Current version; starts at 1, +1 per accepted modification.
    pub version: Version,
    /// The feature's geometry.
    pub geometry: Geometry,
    /// Free-form properties.
    pub properties: Properties,
    /// Ordered delta IDs that have touched this feature, oldest first.
    #[serde(default)]
    pub history: Vec<DeltaId>,
}

impl Feature {
    /// Creates a feature at its initial version with empty history.
    #[must_use]
    pub fn new(id: FeatureId, geometry: Geometry, properties: Properties) -> Self {
        Self {
            id,
            version: Version::INITIAL,
            geometry,
            properties,
            history: Vec::new(),
        }
    }

    /// Records a delta in this feature's history.
    pub fn record_delta(&mut self, delta_id: DeltaId) {
        self.history.push(delta_id);
    }
}
