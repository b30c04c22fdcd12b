//! Server configuration.

use std::net::SocketAddr;

/// Configuration for the feature server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the transport shell should bind to.
    pub bind_addr: SocketAddr,
    /// Maximum number of items accepted in one batch request.
    pub max_batch_items: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_batch_items: 1000,
        }
    }

    /// Sets the maximum batch size.
    pub fn with_max_batch_items(mut self, max: usize) -> Self {
        self.max_batch_items = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8000)))
    }
}
