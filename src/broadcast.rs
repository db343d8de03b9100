use std::sync::Arc;
use tracing::debug;

use crate::registry::{ConnectionId, OutboundFrame, RoomRegistry};

/// Per-broadcast delivery counts, for observability only
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans messages out to a room minus the sender.
///
/// Stateless over the registry: it snapshots the member list under the
/// registry lock and sends outside it, so a slow recipient never stalls
/// joins or leaves. A failed delivery is counted and dropped; there are no
/// retries and no durability.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Delivers a text payload verbatim to every member of the room except
    /// the sender. Individual recipient failures never abort the remaining
    /// deliveries and never propagate to the sender.
    pub fn broadcast_text(
        &self,
        room_id: &str,
        payload: &str,
        sender: ConnectionId,
    ) -> DeliveryReport {
        self.fan_out(room_id, sender, || OutboundFrame::Text(payload.to_string()))
    }

    /// Same contract for opaque byte payloads. An empty payload is a no-op.
    pub fn broadcast_binary(
        &self,
        room_id: &str,
        payload: &[u8],
        sender: ConnectionId,
    ) -> DeliveryReport {
        if payload.is_empty() {
            debug!(room_id = %room_id, "Skipping empty binary payload");
            return DeliveryReport::default();
        }
        self.fan_out(room_id, sender, || OutboundFrame::Binary(payload.to_vec()))
    }

    fn fan_out(
        &self,
        room_id: &str,
        sender: ConnectionId,
        make_frame: impl Fn() -> OutboundFrame,
    ) -> DeliveryReport {
        let recipients = self.registry.members_excluding(room_id, sender);
        let mut report = DeliveryReport::default();

        for recipient in recipients {
            match recipient.sender.send(make_frame()) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    // Pump already gone; the liveness sweep reaps the entry
                    debug!(
                        room_id = %room_id,
                        connection_id = %recipient.id,
                        "Recipient channel closed, dropping message"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}
