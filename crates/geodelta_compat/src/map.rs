//! Bounded map downloads.
//!
//! The legacy client asks for every feature inside a bounding box and
//! expects an `<osm>` document of node elements. Only point features are
//! representable on this wire; features with other geometries inside the
//! box are skipped.

use crate::error::{CompatError, CompatResult};
use geodelta_core::{BoundingBox, Feature, FeatureStore};
use geodelta_xml::{to_xml_document, Element};
use tracing::debug;

/// Parses a `west,south,east,north` bbox query parameter.
pub fn parse_bbox(raw: &str) -> CompatResult<BoundingBox> {
    let mut coords = [0.0f64; 4];
    let mut parts = raw.split(',');
    for slot in &mut coords {
        let part = parts
            .next()
            .ok_or_else(|| CompatError::InvalidBbox(raw.to_string()))?;
        *slot = part
            .trim()
            .parse()
            .map_err(|_| CompatError::InvalidBbox(raw.to_string()))?;
    }
    if parts.next().is_some() {
        return Err(CompatError::InvalidBbox(raw.to_string()));
    }
    let [west, south, east, north] = coords;
    // NaN compares false against everything, so test finiteness explicitly.
    if coords.iter().any(|c| !c.is_finite()) || west > east || south > north {
        return Err(CompatError::InvalidBbox(raw.to_string()));
    }
    Ok(BoundingBox::new(west, south, east, north))
}

/// Renders the features intersecting the bbox as an `<osm>` document.
pub fn map(store: &FeatureStore, bbox: &BoundingBox) -> String {
    let mut root = Element::new("osm")
        .with_attr("version", "0.6")
        .with_attr("generator", "geodelta");

    let mut skipped = 0usize;
    for feature in store.list_in_bbox(bbox) {
        match render_node(&feature) {
            Some(node) => root.children.push(node),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "omitted non-point features from map response");
    }
    to_xml_document(&root)
}

/// Renders one point feature as a node element, or `None` for geometries
/// the wire cannot carry.
fn render_node(feature: &Feature) -> Option<Element> {
    let [lon, lat] = feature.geometry.as_point()?;
    let mut node = Element::new("node")
        .with_attr("id", feature.id.to_string())
        .with_attr("version", feature.version.to_string())
        .with_attr("lon", lon.to_string())
        .with_attr("lat", lat.to_string());
    for (key, value) in &feature.properties {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        node = node.with_child(
            Element::new("tag")
                .with_attr("k", key.clone())
                .with_attr("v", rendered),
        );
    }
    Some(node)
}
