use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::registry::{LivenessSweep, RoomRegistry};
use crate::websockets::StatusEnvelope;

/// Configuration for the liveness monitor
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How often to probe open connections
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Runs the recurring liveness probe over all open connections.
///
/// Each tick evicts connections that produced no traffic since the previous
/// tick, then lowers every surviving flag and enqueues a ping. A connection
/// must stay silent for one full probe cycle before eviction, so worst-case
/// detection latency is two intervals and a single dropped probe never
/// evicts anyone.
pub async fn run_heartbeat(
    registry: Arc<RoomRegistry>,
    broadcaster: Broadcaster,
    config: HeartbeatConfig,
) {
    info!(
        interval_secs = config.interval.as_secs(),
        "Starting heartbeat task"
    );

    let mut probe_interval = interval(config.interval);

    loop {
        // The first tick completes immediately and only arms the flags
        probe_interval.tick().await;

        let sweep = sweep_connections(&registry, &broadcaster);
        if sweep.evicted.is_empty() {
            debug!(probed = sweep.probed, "Heartbeat sweep completed");
        } else {
            info!(
                evicted = sweep.evicted.len(),
                probed = sweep.probed,
                "Heartbeat sweep evicted unresponsive connections"
            );
        }
    }
}

/// One probe cycle: evict the silent, notify their vacated rooms, probe the
/// rest. The registry mutates under its own lock; notifications go out after
/// it is released.
pub fn sweep_connections(registry: &RoomRegistry, broadcaster: &Broadcaster) -> LivenessSweep {
    let sweep = registry.sweep_liveness();

    for evicted in &sweep.evicted {
        warn!(connection_id = %evicted.id, "Terminated unresponsive connection");
        if let (Some(user_id), Some(room_id)) = (&evicted.user_id, &evicted.room_id) {
            let note = StatusEnvelope::user_left(user_id.clone(), room_id.clone());
            broadcaster.broadcast_text(room_id, &note.to_json(), evicted.id);
        }
    }

    sweep
}
