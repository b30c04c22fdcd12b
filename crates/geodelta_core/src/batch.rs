//! Batch operation model.
//!
//! Both protocol front-ends normalize their requests into the same ordered
//! batch of items; the coordinator is the only component that interprets
//! them. Neither adapter duplicates validation logic.

use crate::feature::Properties;
use crate::geometry::Geometry;
use crate::types::{FeatureId, Version};
use serde::{Deserialize, Serialize};

/// The action requested for a single batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Create a new feature; the store assigns the ID.
    Create,
    /// Replace an existing feature's geometry and properties.
    Modify,
    /// Remove an existing feature.
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One requested operation within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    /// The requested action.
    pub action: Action,
    /// Client-supplied ID; required for modify/delete, absent for create.
    pub id: Option<FeatureId>,
    /// Client-supplied version; required for modify/delete.
    pub version: Option<Version>,
    /// New geometry; required for create/modify, ignored for delete.
    pub geometry: Option<Geometry>,
    /// New properties; required for create/modify, ignored for delete.
    pub properties: Option<Properties>,
    /// Client-side placeholder ID, echoed back in per-item results.
    ///
    /// The legacy upload path uses negative placeholders to correlate
    /// submitted elements with their assigned permanent IDs.
    pub placeholder: Option<i64>,
}

impl BatchItem {
    /// Builds a create item.
    #[must_use]
    pub fn create(geometry: Geometry, properties: Properties) -> Self {
        Self {
            action: Action::Create,
            id: None,
            version: None,
            geometry: Some(geometry),
            properties: Some(properties),
            placeholder: None,
        }
    }

    /// Builds a modify item.
    #[must_use]
    pub fn modify(
        id: FeatureId,
        version: Version,
        geometry: Geometry,
        properties: Properties,
    ) -> Self {
        Self {
            action: Action::Modify,
            id: Some(id),
            version: Some(version),
            geometry: Some(geometry),
            properties: Some(properties),
            placeholder: None,
        }
    }

    /// Builds a delete item.
    #[must_use]
    pub fn delete(id: FeatureId, version: Version) -> Self {
        Self {
            action: Action::Delete,
            id: Some(id),
            version: Some(version),
            geometry: None,
            properties: None,
            placeholder: None,
        }
    }

    /// Attaches a client-side placeholder ID.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: i64) -> Self {
        self.placeholder = Some(placeholder);
        self
    }
}

/// An ordered sequence of operations committed as one delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// The items, in submission order.
    pub items: Vec<BatchItem>,
}

impl Batch {
    /// Creates an empty batch.
    ///
    /// An empty batch is a valid no-op: it commits trivially and writes no
    /// delta.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates a batch from items.
    #[must_use]
    pub fn from_items(items: Vec<BatchItem>) -> Self {
        Self { items }
    }

    /// Appends an item.
    pub fn push(&mut self, item: BatchItem) {
        self.items.push(item);
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Create).unwrap(), "\"create\"");
        assert_eq!(serde_json::to_string(&Action::Delete).unwrap(), "\"delete\"");
    }

    #[test]
    fn builders_fill_expected_fields() {
        let create = BatchItem::create(Geometry::point(0.0, 0.0), Properties::new());
        assert_eq!(create.action, Action::Create);
        assert!(create.id.is_none());

        let delete = BatchItem::delete(FeatureId::new(4), Version::new(2));
        assert_eq!(delete.action, Action::Delete);
        assert!(delete.geometry.is_none());
    }

    #[test]
    fn placeholder_attaches() {
        let item = BatchItem::create(Geometry::point(0.0, 0.0), Properties::new())
            .with_placeholder(-3);
        assert_eq!(item.placeholder, Some(-3));
    }
}
