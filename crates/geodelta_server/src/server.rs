//! Main feature server facade.

use crate::auth::Credentials;
use crate::config::ServerConfig;
use crate::error::Response;
use crate::handler::{HandlerContext, RequestHandler};
use geodelta_core::{
    BoundsRegistry, Coordinator, CoreResult, DeltaId, DeltaLog, FeatureId, FeatureStore,
    UserLedger,
};
use std::sync::Arc;

/// The feature server.
///
/// Owns the transaction coordinator and bounds registry and exposes every
/// endpoint as a method returning a `(status, body)` response. A transport
/// shell maps routes onto these methods.
///
/// # Example
///
/// ```
/// use geodelta_server::{Credentials, GeoServer, ServerConfig};
///
/// let server = GeoServer::new(ServerConfig::default());
/// server.coordinator().users().register("ingalls", "yeaheh", "i@example.com").unwrap();
///
/// let credentials = Credentials::new("ingalls", "yeaheh");
/// let response = server.feature(Some(&credentials), r#"{
///     "type": "Feature",
///     "action": "create",
///     "geometry": {"type": "Point", "coordinates": [-77.03, 38.9]},
///     "properties": {"shop": true}
/// }"#);
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body, "true");
/// ```
pub struct GeoServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl GeoServer {
    /// Creates a server with fresh, empty state.
    pub fn new(config: ServerConfig) -> Self {
        let coordinator = Arc::new(Coordinator::new(
            Arc::new(FeatureStore::new()),
            Arc::new(DeltaLog::new()),
            Arc::new(UserLedger::new()),
        ));
        Self::with_coordinator(config, coordinator, Arc::new(BoundsRegistry::new()))
    }

    /// Creates a server over an existing coordinator and bounds registry.
    pub fn with_coordinator(
        config: ServerConfig,
        coordinator: Arc<Coordinator>,
        bounds: Arc<BoundsRegistry>,
    ) -> Self {
        let context = Arc::new(HandlerContext::new(config, coordinator, bounds));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Returns the shared transaction coordinator.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.context.coordinator
    }

    /// Returns the bounds registry.
    pub fn bounds(&self) -> &Arc<BoundsRegistry> {
        &self.context.bounds
    }

    /// Rebuilds the feature-store projection from the delta log.
    pub fn recover(&self) -> CoreResult<()> {
        self.context.coordinator.recover()
    }

    /// Single-feature write.
    pub fn feature(&self, credentials: Option<&Credentials>, body: &str) -> Response {
        self.respond(self.handler.handle_feature(credentials, body))
    }

    /// Feature-collection write.
    pub fn features(&self, credentials: Option<&Credentials>, body: &str) -> Response {
        self.respond(self.handler.handle_features(credentials, body))
    }

    /// Single-feature read.
    pub fn feature_get(&self, id: FeatureId) -> Response {
        self.respond(self.handler.handle_feature_get(id))
    }

    /// User registration.
    pub fn register(&self, username: &str, password: &str, email: &str) -> Response {
        self.respond(self.handler.handle_register(username, password, email))
    }

    /// Delta log listing.
    pub fn deltas(&self) -> Response {
        self.respond(self.handler.handle_deltas())
    }

    /// Single delta read.
    pub fn delta_get(&self, id: DeltaId) -> Response {
        self.respond(self.handler.handle_delta_get(id))
    }

    /// Bound registration.
    pub fn bound_create(
        &self,
        credentials: Option<&Credentials>,
        name: &str,
        body: &str,
    ) -> Response {
        self.respond(self.handler.handle_bound_create(credentials, name, body))
    }

    /// Bound name listing.
    pub fn bounds_list(&self) -> Response {
        self.respond(self.handler.handle_bounds())
    }

    /// Features within a named bound.
    pub fn bound_get(&self, name: &str) -> Response {
        self.respond(self.handler.handle_bound_get(name))
    }

    /// Legacy changeset create.
    pub fn changeset_create(&self, credentials: Option<&Credentials>, body: &str) -> Response {
        self.respond(self.handler.handle_changeset_create(credentials, body))
    }

    /// Legacy edit upload.
    pub fn changeset_upload(
        &self,
        credentials: Option<&Credentials>,
        delta_id: DeltaId,
        body: &str,
    ) -> Response {
        self.respond(
            self.handler
                .handle_changeset_upload(credentials, delta_id, body),
        )
    }

    /// Legacy bounded map download.
    pub fn map(&self, bbox: &str) -> Response {
        self.respond(self.handler.handle_map(bbox))
    }

    fn respond(&self, result: crate::error::ServerResult<Response>) -> Response {
        result.unwrap_or_else(|err| err.response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_with_user() -> (GeoServer, Credentials) {
        let server = GeoServer::new(ServerConfig::default());
        server
            .coordinator()
            .users()
            .register("ingalls", "yeaheh", "ingalls@protonmail.com")
            .unwrap();
        (server, Credentials::new("ingalls", "yeaheh"))
    }

    #[test]
    fn unauthorized_writes_map_to_their_wire_shapes() {
        let (server, _) = server_with_user();

        let response = server.feature(None, "{}");
        assert_eq!(response.status, 401);
        assert!(response.body.starts_with('{'));

        let bad = Credentials::new("ingalls", "wrong");
        let response = server.feature(Some(&bad), "{}");
        assert_eq!(response.status, 401);
        assert_eq!(response.body, "Not Authorized!");
    }

    #[test]
    fn malformed_body_maps_to_fixed_message() {
        let (server, credentials) = server_with_user();
        let response = server.feature(Some(&credentials), "not geojson");
        assert_eq!(response.status, 400);
        assert_eq!(response.body, "Body must be valid GeoJSON Feature");
    }

    #[test]
    fn recover_preserves_served_state() {
        let (server, credentials) = server_with_user();
        server.feature(
            Some(&credentials),
            r#"{"type": "Feature", "action": "create",
                "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                "properties": {}}"#,
        );

        server.recover().unwrap();
        let response = server.feature_get(FeatureId::new(1));
        assert_eq!(response.status, 200);
    }
}
