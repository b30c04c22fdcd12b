//! Request handlers for the feature server endpoints.

use crate::auth::{authenticate, Credentials};
use crate::config::ServerConfig;
use crate::error::{Response, ServerError, ServerResult};
use crate::geojson;
use geodelta_compat::{create_changeset, map, parse_bbox, upload};
use geodelta_core::{
    Batch, BoundsRegistry, Coordinator, DeltaId, DeltaMetadata, FeatureId, Geometry,
};
use std::sync::Arc;
use tracing::debug;

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The transaction coordinator shared by both protocol paths.
    pub coordinator: Arc<Coordinator>,
    /// Registry of named coverage polygons.
    pub bounds: Arc<BoundsRegistry>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(
        config: ServerConfig,
        coordinator: Arc<Coordinator>,
        bounds: Arc<BoundsRegistry>,
    ) -> Self {
        Self {
            config,
            coordinator,
            bounds,
        }
    }
}

/// Handler for feature server requests.
///
/// Methods take decoded request values and return `(status, body)`
/// responses; the transport shell handles routing and I/O.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a single-feature write: a GeoJSON Feature with an `action`.
    pub fn handle_feature(
        &self,
        credentials: Option<&Credentials>,
        body: &str,
    ) -> ServerResult<Response> {
        let author = authenticate(self.context.coordinator.users(), credentials)?;
        let item = geojson::parse_feature(body)?;
        let batch = Batch::from_items(vec![item]);
        self.context
            .coordinator
            .commit(author, DeltaMetadata::new(), &batch)?;
        Ok(Response::accepted())
    }

    /// Handles a multi-feature write: a GeoJSON FeatureCollection whose
    /// features each carry an `action`.
    pub fn handle_features(
        &self,
        credentials: Option<&Credentials>,
        body: &str,
    ) -> ServerResult<Response> {
        let author = authenticate(self.context.coordinator.users(), credentials)?;
        let batch = geojson::parse_collection(body)?;
        if batch.len() > self.context.config.max_batch_items {
            return Err(ServerError::InvalidRequest(format!(
                "batch exceeds {} items",
                self.context.config.max_batch_items
            )));
        }
        self.context
            .coordinator
            .commit(author, DeltaMetadata::new(), &batch)?;
        Ok(Response::accepted())
    }

    /// Returns a single feature as GeoJSON.
    pub fn handle_feature_get(&self, id: FeatureId) -> ServerResult<Response> {
        let feature = self.context.coordinator.store().get(id)?;
        Ok(Response::ok(geojson::feature_json(&feature)))
    }

    /// Registers a new user.
    pub fn handle_register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> ServerResult<Response> {
        let user = self
            .context
            .coordinator
            .users()
            .register(username, password, email)?;
        debug!(user = user.id.as_u64(), username, "registered user");
        Ok(Response::accepted())
    }

    /// Lists all deltas in commit order as JSON.
    pub fn handle_deltas(&self) -> ServerResult<Response> {
        let deltas = self.context.coordinator.log().list();
        let body = serde_json::to_string(&deltas)
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        Ok(Response::ok(body))
    }

    /// Returns one delta as JSON.
    pub fn handle_delta_get(&self, id: DeltaId) -> ServerResult<Response> {
        let delta = self.context.coordinator.log().get(id)?;
        let body = serde_json::to_string(&delta)
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        Ok(Response::ok(body))
    }

    /// Registers a named coverage polygon from a GeoJSON geometry body.
    pub fn handle_bound_create(
        &self,
        credentials: Option<&Credentials>,
        name: &str,
        body: &str,
    ) -> ServerResult<Response> {
        authenticate(self.context.coordinator.users(), credentials)?;
        let geometry: Geometry = serde_json::from_str(body)
            .map_err(|e| geodelta_core::CoreError::malformed(e.to_string()))?;
        self.context.bounds.create(name, geometry)?;
        Ok(Response::accepted())
    }

    /// Lists registered bound names as a JSON array.
    pub fn handle_bounds(&self) -> ServerResult<Response> {
        let names = self.context.bounds.list();
        let body = serde_json::to_string(&names)
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        Ok(Response::ok(body))
    }

    /// Returns the features within a named bound as a FeatureCollection.
    pub fn handle_bound_get(&self, name: &str) -> ServerResult<Response> {
        let features = self
            .context
            .bounds
            .features_in(name, self.context.coordinator.store())?;
        Ok(Response::ok(geojson::collection_json(&features)))
    }

    /// Legacy changeset create; responds with the delta ID as plain text.
    pub fn handle_changeset_create(
        &self,
        credentials: Option<&Credentials>,
        body: &str,
    ) -> ServerResult<Response> {
        let author = authenticate(self.context.coordinator.users(), credentials)?;
        let delta_id = create_changeset(&self.context.coordinator, author, body)?;
        Ok(Response::ok(delta_id.to_string()))
    }

    /// Legacy edit upload into an open changeset; responds with diffResult
    /// XML.
    pub fn handle_changeset_upload(
        &self,
        credentials: Option<&Credentials>,
        delta_id: DeltaId,
        body: &str,
    ) -> ServerResult<Response> {
        let author = authenticate(self.context.coordinator.users(), credentials)?;
        let diff = upload(&self.context.coordinator, author, delta_id, body)?;
        Ok(Response::ok(diff))
    }

    /// Legacy bounded map download; responds with an XML document.
    pub fn handle_map(&self, bbox: &str) -> ServerResult<Response> {
        let bbox = parse_bbox(bbox)?;
        Ok(Response::ok(map(self.context.coordinator.store(), &bbox)))
    }
}
