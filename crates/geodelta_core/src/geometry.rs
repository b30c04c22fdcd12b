//! Geometry model.
//!
//! Geometries follow the GeoJSON shape on the wire: a tagged object with a
//! `type` discriminator and a `coordinates` array of longitude/latitude
//! pairs. The store treats geometries as opaque values; the only spatial
//! capability exposed here is bounding-box extraction and overlap, which is
//! what the store's bbox listing is built on.

use serde::{Deserialize, Serialize};

/// A single coordinate pair: `[longitude, latitude]`.
pub type Position = [f64; 2];

/// A geographic bounding box in `[west, south, east, north]` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western (minimum) longitude.
    pub west: f64,
    /// Southern (minimum) latitude.
    pub south: f64,
    /// Eastern (maximum) longitude.
    pub east: f64,
    /// Northern (maximum) latitude.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its four edges.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns the degenerate box covering a single position.
    #[must_use]
    pub const fn from_position(pos: Position) -> Self {
        Self::new(pos[0], pos[1], pos[0], pos[1])
    }

    /// Extends this box to cover another.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Returns true if the two boxes overlap (edges touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

    /// Returns true if the box contains a position (edges inclusive).
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos[0] >= self.west && pos[0] <= self.east && pos[1] >= self.south && pos[1] <= self.north
    }
}

/// A geospatial geometry.
///
/// The serde representation matches GeoJSON exactly, so coordinates
/// submitted through the native JSON path round-trip without alteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position.
    Point {
        /// The position.
        coordinates: Position,
    },
    /// A set of positions.
    MultiPoint {
        /// The positions.
        coordinates: Vec<Position>,
    },
    /// A connected sequence of positions.
    LineString {
        /// The positions, in order.
        coordinates: Vec<Position>,
    },
    /// A set of line strings.
    MultiLineString {
        /// One position sequence per line.
        coordinates: Vec<Vec<Position>>,
    },
    /// A polygon; the first ring is the exterior, the rest are holes.
    Polygon {
        /// The rings, exterior first.
        coordinates: Vec<Vec<Position>>,
    },
}

impl Geometry {
    /// Creates a point geometry.
    #[must_use]
    pub const fn point(lon: f64, lat: f64) -> Self {
        Self::Point {
            coordinates: [lon, lat],
        }
    }

    /// Returns true if this is a point geometry.
    #[must_use]
    pub const fn is_point(&self) -> bool {
        matches!(self, Self::Point { .. })
    }

    /// Returns the point's position, if this is a point.
    #[must_use]
    pub const fn as_point(&self) -> Option<Position> {
        match self {
            Self::Point { coordinates } => Some(*coordinates),
            _ => None,
        }
    }

    /// Iterates over every position in the geometry.
    pub fn positions(&self) -> Box<dyn Iterator<Item = Position> + '_> {
        match self {
            Self::Point { coordinates } => Box::new(std::iter::once(*coordinates)),
            Self::MultiPoint { coordinates } | Self::LineString { coordinates } => {
                Box::new(coordinates.iter().copied())
            }
            Self::MultiLineString { coordinates } | Self::Polygon { coordinates } => {
                Box::new(coordinates.iter().flat_map(|ring| ring.iter().copied()))
            }
        }
    }

    /// Computes the bounding box of the geometry.
    ///
    /// Returns `None` for geometries with no positions (an empty
    /// multi-part geometry).
    #[must_use]
    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut positions = self.positions();
        let first = BoundingBox::from_position(positions.next()?);
        Some(positions.fold(first, |acc, pos| {
            acc.union(BoundingBox::from_position(pos))
        }))
    }

    /// Returns true if the geometry's bounding box overlaps the given box.
    #[must_use]
    pub fn intersects(&self, bbox: &BoundingBox) -> bool {
        self.bbox().is_some_and(|own| own.intersects(bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_serializes_as_geojson() {
        let geom = Geometry::point(1.5, -2.25);
        let json = serde_json::to_value(&geom).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "Point", "coordinates": [1.5, -2.25]})
        );
    }

    #[test]
    fn polygon_with_hole_roundtrip() {
        let geom = Geometry::Polygon {
            coordinates: vec![
                vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                vec![[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0], [1.0, 1.0]],
            ],
        };
        let json = serde_json::to_string(&geom).unwrap();
        let back: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(geom, back);
    }

    #[test]
    fn bbox_covers_all_rings() {
        let geom = Geometry::MultiLineString {
            coordinates: vec![vec![[-1.0, -2.0], [3.0, 1.0]], vec![[0.0, 5.0]]],
        };
        let bbox = geom.bbox().unwrap();
        assert_eq!(bbox, BoundingBox::new(-1.0, -2.0, 3.0, 5.0));
    }

    #[test]
    fn bbox_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::new(1.0, 1.0, 3.0, 3.0);
        let c = BoundingBox::new(5.0, 5.0, 6.0, 6.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn point_intersects_box() {
        let geom = Geometry::point(1.0, 1.0);
        assert!(geom.intersects(&BoundingBox::new(0.0, 0.0, 2.0, 2.0)));
        assert!(!geom.intersects(&BoundingBox::new(2.5, 2.5, 3.0, 3.0)));
    }

    #[test]
    fn unknown_geometry_type_rejected() {
        let result: Result<Geometry, _> = serde_json::from_str(
            r#"{"type": "GeometryCollection", "coordinates": []}"#,
        );
        assert!(result.is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_position() -> impl Strategy<Value = Position> + Clone {
            (-180.0f64..180.0, -90.0f64..90.0).prop_map(|(lon, lat)| [lon, lat])
        }

        fn arb_geometry() -> impl Strategy<Value = Geometry> {
            let line = proptest::collection::vec(arb_position(), 2..8);
            prop_oneof![
                arb_position().prop_map(|coordinates| Geometry::Point { coordinates }),
                proptest::collection::vec(arb_position(), 1..8)
                    .prop_map(|coordinates| Geometry::MultiPoint { coordinates }),
                line.clone().prop_map(|coordinates| Geometry::LineString { coordinates }),
                proptest::collection::vec(line.clone(), 1..4)
                    .prop_map(|coordinates| Geometry::MultiLineString { coordinates }),
                proptest::collection::vec(proptest::collection::vec(arb_position(), 4..8), 1..3)
                    .prop_map(|coordinates| Geometry::Polygon { coordinates }),
            ]
        }

        proptest! {
            #[test]
            fn json_roundtrip_preserves_coordinates(geom in arb_geometry()) {
                let json = serde_json::to_string(&geom).unwrap();
                let back: Geometry = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(geom, back);
            }

            #[test]
            fn bbox_contains_every_position(geom in arb_geometry()) {
                let bbox = geom.bbox().unwrap();
                for pos in geom.positions() {
                    prop_assert!(bbox.contains(pos));
                }
            }
        }
    }
}
