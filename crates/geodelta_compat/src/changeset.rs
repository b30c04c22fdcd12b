//! Changeset creation.
//!
//! A changeset moves through two states: open (created with its metadata,
//! empty snapshot, not finalized) and finalized (exactly one edit-upload
//! accepted). The state lives on the delta itself; this module handles the
//! create step.

use crate::error::{CompatError, CompatResult};
use geodelta_core::{Coordinator, DeltaId, DeltaMetadata, UserId};
use geodelta_xml::{from_xml, Element};
use tracing::debug;

/// Parses a changeset-create body and opens a delta for it.
///
/// The body is `<osm><changeset><tag k="..." v="..."/>...</changeset></osm>`;
/// tag elements become the delta's metadata. Returns the assigned delta ID,
/// which the caller reports as the plain-text response body.
pub fn create_changeset(
    coordinator: &Coordinator,
    author: UserId,
    body: &str,
) -> CompatResult<DeltaId> {
    let metadata = parse_changeset_metadata(body)?;
    let delta_id = coordinator.log().open(metadata, author);
    debug!(delta = delta_id.as_u64(), "opened changeset");
    Ok(delta_id)
}

/// Extracts the metadata map from a changeset document.
pub fn parse_changeset_metadata(body: &str) -> CompatResult<DeltaMetadata> {
    let root = from_xml(body)?;
    if root.name != "osm" {
        return Err(CompatError::UnexpectedRoot {
            expected: "osm".into(),
            found: root.name,
        });
    }

    let mut metadata = DeltaMetadata::new();
    for changeset in root.children_named("changeset") {
        for tag in changeset.children_named("tag") {
            let (key, value) = tag_pair(tag)?;
            metadata.insert(key, serde_json::Value::String(value));
        }
    }
    Ok(metadata)
}

/// Reads the `k`/`v` attribute pair off a tag element.
pub(crate) fn tag_pair(tag: &Element) -> CompatResult<(String, String)> {
    let key = tag
        .attr("k")
        .ok_or_else(|| CompatError::missing_attribute("tag", "k"))?;
    let value = tag
        .attr("v")
        .ok_or_else(|| CompatError::missing_attribute("tag", "v"))?;
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_tags() {
        let body = r#"<osm><changeset>
            <tag k="created_by" v="geodelta-client"/>
            <tag k="comment" v="grocery stores"/>
        </changeset></osm>"#;

        let metadata = parse_changeset_metadata(body).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.get("comment"),
            Some(&serde_json::Value::String("grocery stores".into()))
        );
    }

    #[test]
    fn empty_changeset_yields_empty_metadata() {
        let metadata = parse_changeset_metadata("<osm><changeset/></osm>").unwrap();
        assert!(metadata.is_empty());
    }

    #[test]
    fn wrong_root_rejected() {
        let err = parse_changeset_metadata("<changeset/>").unwrap_err();
        assert!(matches!(err, CompatError::UnexpectedRoot { .. }));
    }

    #[test]
    fn tag_missing_value_rejected() {
        let body = r#"<osm><changeset><tag k="comment"/></changeset></osm>"#;
        let err = parse_changeset_metadata(body).unwrap_err();
        assert_eq!(err, CompatError::missing_attribute("tag", "v"));
    }
}
