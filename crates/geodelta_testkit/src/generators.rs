//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random geometries, properties, and
//! batches that maintain required invariants.

use geodelta_core::{BatchItem, Geometry, Position, Properties};
use proptest::prelude::*;

/// Strategy for a longitude/latitude pair within world bounds.
pub fn position_strategy() -> impl Strategy<Value = Position> {
    (-180.0f64..=180.0, -90.0f64..=90.0).prop_map(|(lon, lat)| [lon, lat])
}

/// Strategy for a non-empty position list.
pub fn positions_strategy() -> impl Strategy<Value = Vec<Position>> {
    prop::collection::vec(position_strategy(), 1..8)
}

/// Strategy for a linear ring: at least four positions, closed.
pub fn ring_strategy() -> impl Strategy<Value = Vec<Position>> {
    prop::collection::vec(position_strategy(), 3..8).prop_map(|mut ring| {
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
        ring
    })
}

/// Strategy covering all five geometry types.
pub fn geometry_strategy() -> impl Strategy<Value = Geometry> {
    prop_oneof![
        position_strategy().prop_map(|coordinates| Geometry::Point { coordinates }),
        positions_strategy().prop_map(|coordinates| Geometry::MultiPoint { coordinates }),
        prop::collection::vec(position_strategy(), 2..8)
            .prop_map(|coordinates| Geometry::LineString { coordinates }),
        prop::collection::vec(prop::collection::vec(position_strategy(), 2..6), 1..4)
            .prop_map(|coordinates| Geometry::MultiLineString { coordinates }),
        prop::collection::vec(ring_strategy(), 1..3)
            .prop_map(|coordinates| Geometry::Polygon { coordinates }),
    ]
}

/// Strategy for small string-keyed property maps.
pub fn properties_strategy() -> impl Strategy<Value = Properties> {
    prop::collection::vec(
        (
            prop::string::string_regex("[a-z][a-z_]{0,9}").expect("valid regex"),
            prop_oneof![
                any::<bool>().prop_map(serde_json::Value::Bool),
                any::<i32>().prop_map(|n| serde_json::Value::from(n)),
                prop::string::string_regex("[a-z ]{0,12}")
                    .expect("valid regex")
                    .prop_map(serde_json::Value::String),
            ],
        ),
        0..5,
    )
    .prop_map(|pairs| pairs.into_iter().collect())
}

/// Strategy for create items with random geometry and properties.
pub fn create_item_strategy() -> impl Strategy<Value = BatchItem> {
    (geometry_strategy(), properties_strategy())
        .prop_map(|(geometry, properties)| BatchItem::create(geometry, properties))
}
