//! Edit uploads.
//!
//! An upload is an `<osmChange>` document with `<create>`, `<modify>`, and
//! `<delete>` sections. Each node element becomes a point feature whose
//! properties come from its tag elements. The whole document is translated
//! into one coordinator batch committed into the changeset's open delta; on
//! success the changeset is finalized and a `<diffResult>` maps the
//! submitted placeholder IDs to their assigned permanent IDs.

use crate::changeset::tag_pair;
use crate::error::{CompatError, CompatResult};
use crate::precision::reduce_position;
use geodelta_core::{
    Action, Batch, BatchItem, CommitOutcome, Coordinator, DeltaId, FeatureId, Geometry,
    Properties, UserId, Version,
};
use geodelta_xml::{from_xml, to_xml_document, Element};
use tracing::debug;

/// Applies an upload body to the given open changeset.
///
/// Returns the `<diffResult>` response document. The changeset accepts at
/// most one successful upload; a second attempt fails because the delta is
/// already finalized.
pub fn upload(
    coordinator: &Coordinator,
    author: UserId,
    delta_id: DeltaId,
    body: &str,
) -> CompatResult<String> {
    let batch = parse_upload(body)?;
    let outcome = coordinator.commit_into(author, delta_id, &batch)?;
    debug!(
        delta = delta_id.as_u64(),
        items = batch.len(),
        "accepted upload"
    );
    Ok(render_diff_result(&outcome))
}

/// Parses an `<osmChange>` document into a coordinator batch.
///
/// Only node elements are representable in this projection; ways and
/// relations are rejected.
pub fn parse_upload(body: &str) -> CompatResult<Batch> {
    let root = from_xml(body)?;
    if root.name != "osmChange" {
        return Err(CompatError::UnexpectedRoot {
            expected: "osmChange".into(),
            found: root.name,
        });
    }

    let mut batch = Batch::new();
    for section in &root.children {
        let action = match section.name.as_str() {
            "create" => Action::Create,
            "modify" => Action::Modify,
            "delete" => Action::Delete,
            other => {
                return Err(CompatError::UnsupportedElement {
                    name: other.to_string(),
                })
            }
        };
        for element in &section.children {
            if element.name != "node" {
                return Err(CompatError::UnsupportedElement {
                    name: element.name.clone(),
                });
            }
            batch.push(parse_node(element, action)?);
        }
    }
    Ok(batch)
}

fn parse_node(node: &Element, action: Action) -> CompatResult<BatchItem> {
    let raw_id = require_attr(node, "id")?;
    let submitted_id: i64 = raw_id
        .parse()
        .map_err(|_| CompatError::invalid_number("id", raw_id))?;

    let item = match action {
        Action::Create => {
            BatchItem::create(node_geometry(node)?, node_properties(node)?)
        }
        Action::Modify => {
            let id = positive_id("id", raw_id, submitted_id)?;
            BatchItem::modify(
                id,
                node_version(node)?,
                node_geometry(node)?,
                node_properties(node)?,
            )
        }
        Action::Delete => {
            let id = positive_id("id", raw_id, submitted_id)?;
            BatchItem::delete(id, node_version(node)?)
        }
    };
    Ok(item.with_placeholder(submitted_id))
}

/// Builds the node's point geometry, narrowing through the legacy
/// precision policy.
fn node_geometry(node: &Element) -> CompatResult<Geometry> {
    let lon = numeric_attr(node, "lon")?;
    let lat = numeric_attr(node, "lat")?;
    let [lon, lat] = reduce_position(lon, lat);
    Ok(Geometry::point(lon, lat))
}

fn node_properties(node: &Element) -> CompatResult<Properties> {
    let mut properties = Properties::new();
    for tag in node.children_named("tag") {
        let (key, value) = tag_pair(tag)?;
        properties.insert(key, serde_json::Value::String(value));
    }
    Ok(properties)
}

fn node_version(node: &Element) -> CompatResult<Version> {
    let raw = require_attr(node, "version")?;
    raw.parse::<u64>()
        .map(Version::new)
        .map_err(|_| CompatError::invalid_number("version", raw))
}

fn numeric_attr(node: &Element, name: &str) -> CompatResult<f64> {
    let raw = require_attr(node, name)?;
    raw.parse::<f64>()
        .map_err(|_| CompatError::invalid_number(name, raw))
}

fn require_attr<'a>(node: &'a Element, name: &str) -> CompatResult<&'a str> {
    node.attr(name)
        .ok_or_else(|| CompatError::missing_attribute("node", name))
}

fn positive_id(attribute: &str, raw: &str, value: i64) -> CompatResult<FeatureId> {
    u64::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .map(FeatureId::new)
        .ok_or_else(|| CompatError::invalid_number(attribute, raw))
}

/// Renders the translation response mapping placeholders to assigned IDs.
fn render_diff_result(outcome: &CommitOutcome) -> String {
    let mut root = Element::new("diffResult");
    for item in &outcome.items {
        let old_id = item
            .placeholder
            .map(|p| p.to_string())
            .unwrap_or_else(|| item.id.to_string());
        let mut node = Element::new("node").with_attr("old_id", old_id);
        if item.action != Action::Delete {
            node = node.with_attr("new_id", item.id.to_string());
            if let Some(version) = item.version {
                node = node.with_attr("new_version", version.to_string());
            }
        }
        root.children.push(node);
    }
    to_xml_document(&root)
}
