use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::config::RelayConfig;
use crate::registry::RoomRegistry;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub broadcaster: Broadcaster,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(
        registry: Arc<RoomRegistry>,
        broadcaster: Broadcaster,
        config: Arc<RelayConfig>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            config,
        }
    }

    /// Builds the full dependency graph from a configuration
    pub fn from_config(config: RelayConfig) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self::new(registry, broadcaster, Arc::new(config))
    }
}
