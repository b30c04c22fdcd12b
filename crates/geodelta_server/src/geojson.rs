//! GeoJSON request and response bodies for the native path.
//!
//! Requests are GeoJSON Features carrying an `action` member, or
//! FeatureCollections of them. Coordinates parse as `f64` and are stored
//! without narrowing, so the native path round-trips them exactly.

use crate::error::ServerResult;
use geodelta_core::{Action, Batch, BatchItem, CoreError, Feature, FeatureId, Geometry, Version};
use serde_json::Value;

/// Parses a single GeoJSON Feature body into a one-item batch.
pub fn parse_feature(body: &str) -> ServerResult<BatchItem> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CoreError::malformed(e.to_string()))?;
    parse_feature_value(&value)
}

/// Parses a GeoJSON FeatureCollection body into a batch.
pub fn parse_collection(body: &str) -> ServerResult<Batch> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CoreError::malformed(e.to_string()))?;
    if value.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(CoreError::malformed("expected a FeatureCollection").into());
    }
    let features = value
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::malformed("FeatureCollection has no features array"))?;

    let mut batch = Batch::new();
    for feature in features {
        batch.push(parse_feature_value(feature)?);
    }
    Ok(batch)
}

fn parse_feature_value(value: &Value) -> ServerResult<BatchItem> {
    if value.get("type").and_then(Value::as_str) != Some("Feature") {
        return Err(CoreError::malformed("expected a GeoJSON Feature").into());
    }

    let action = match value.get("action").and_then(Value::as_str) {
        Some("create") => Action::Create,
        Some("modify") => Action::Modify,
        Some("delete") => Action::Delete,
        Some(other) => {
            return Err(CoreError::malformed(format!("unknown action: {other}")).into())
        }
        None => return Err(CoreError::malformed("feature has no action").into()),
    };

    // IDs and versions pass through unchecked; the coordinator decides
    // whether their presence is valid for the action.
    let id = optional_u64(value, "id")?.map(FeatureId::new);
    let version = optional_u64(value, "version")?.map(Version::new);

    let geometry = match value.get("geometry") {
        Some(Value::Null) | None => None,
        Some(raw) => Some(
            serde_json::from_value::<Geometry>(raw.clone())
                .map_err(|e| CoreError::malformed(format!("invalid geometry: {e}")))?,
        ),
    };
    let properties = match value.get("properties") {
        Some(Value::Null) | None => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => return Err(CoreError::malformed("properties must be an object").into()),
    };

    Ok(BatchItem {
        action,
        id,
        version,
        geometry,
        properties,
        placeholder: None,
    })
}

fn optional_u64(value: &Value, key: &str) -> ServerResult<Option<u64>> {
    match value.get(key) {
        Some(Value::Null) | None => Ok(None),
        Some(raw) => raw
            .as_u64()
            .map(Some)
            .ok_or_else(|| CoreError::malformed(format!("{key} must be a non-negative integer")).into()),
    }
}

/// Renders a stored feature as a GeoJSON Feature.
pub fn feature_json(feature: &Feature) -> String {
    feature_value(feature).to_string()
}

/// Renders stored features as a GeoJSON FeatureCollection.
pub fn collection_json(features: &[Feature]) -> String {
    serde_json::json!({
        "type": "FeatureCollection",
        "features": features.iter().map(feature_value).collect::<Vec<_>>(),
    })
    .to_string()
}

fn feature_value(feature: &Feature) -> Value {
    serde_json::json!({
        "type": "Feature",
        "id": feature.id,
        "version": feature.version,
        "geometry": feature.geometry,
        "properties": feature.properties,
    })
}
