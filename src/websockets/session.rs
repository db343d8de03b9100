use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::registry::{ConnectionId, JoinOutcome, LeaveOutcome, OutboundFrame, RoomRegistry};

use super::envelope::{ControlEnvelope, StatusEnvelope};
use super::socket::SocketEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Registered, no room membership yet
    Connected,
    /// Member of exactly one room
    InRoom { user_id: String, room_id: String },
    /// Terminal; all further events are ignored
    Closed,
}

/// Per-connection lifecycle state machine.
///
/// Driven by `SocketEvent`s regardless of how the transport delivers them.
/// Malformed input never kills the session; only a close or transport error
/// does. Every inbound event counts as liveness traffic.
pub struct Session {
    id: ConnectionId,
    registry: Arc<RoomRegistry>,
    broadcaster: Broadcaster,
    default_room: String,
    state: SessionState,
}

impl Session {
    pub fn new(
        id: ConnectionId,
        registry: Arc<RoomRegistry>,
        broadcaster: Broadcaster,
        default_room: String,
    ) -> Self {
        Self {
            id,
            registry,
            broadcaster,
            default_room,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Feed one transport event. Returns true once the session has reached
    /// its terminal state.
    pub fn handle_event(&mut self, event: SocketEvent) -> bool {
        if self.state == SessionState::Closed {
            return true;
        }
        self.registry.mark_alive(self.id);

        match event {
            SocketEvent::Text(text) => self.handle_text(&text),
            SocketEvent::Binary(bytes) => self.handle_binary(&bytes),
            SocketEvent::Pong => {} // liveness only, already marked
            SocketEvent::Closed => {
                debug!(connection_id = %self.id, "Socket closed");
                self.close();
            }
            SocketEvent::Errored(reason) => {
                warn!(connection_id = %self.id, error = %reason, "Socket error, closing connection");
                self.close();
            }
        }

        self.state == SessionState::Closed
    }

    /// Tears the session down: leaves the current room, notifies the
    /// remaining members, and drops the registry entry. Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        match self.registry.unregister(self.id) {
            LeaveOutcome::Left {
                room_id,
                room_deleted,
            } => {
                if let SessionState::InRoom { user_id, .. } = &self.state {
                    let note = StatusEnvelope::user_left(user_id.clone(), room_id.clone());
                    self.broadcaster.broadcast_text(&room_id, &note.to_json(), self.id);
                }
                info!(
                    connection_id = %self.id,
                    room_id = %room_id,
                    room_deleted = room_deleted,
                    "Connection left room on close"
                );
            }
            LeaveOutcome::NotInRoom => {
                debug!(connection_id = %self.id, "Connection closed without room membership");
            }
        }

        self.state = SessionState::Closed;
    }

    fn handle_text(&mut self, text: &str) {
        let envelope = match ControlEnvelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "Discarding unparseable text frame");
                return;
            }
        };

        if envelope.is_join_request() {
            self.handle_join(envelope);
            return;
        }

        // Everything else passes through verbatim, join-gated
        match &self.state {
            SessionState::InRoom { room_id, .. } => {
                let room_id = room_id.clone();
                let report = self.broadcaster.broadcast_text(&room_id, text, self.id);
                debug!(
                    connection_id = %self.id,
                    room_id = %room_id,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Relayed text frame"
                );
            }
            _ => {
                debug!(connection_id = %self.id, "Dropping text frame received before join");
            }
        }
    }

    fn handle_join(&mut self, envelope: ControlEnvelope) {
        let Some(requested_user) = envelope.user_id else {
            warn!(connection_id = %self.id, "Discarding join request without userId");
            return;
        };
        // The user id is fixed by the first join for the connection's lifetime
        let user_id = match &self.state {
            SessionState::InRoom { user_id, .. } => user_id.clone(),
            _ => requested_user,
        };
        let room_id = envelope
            .room_id
            .unwrap_or_else(|| self.default_room.clone());

        match self.registry.join(self.id, &room_id, &user_id) {
            JoinOutcome::Joined => {
                info!(
                    connection_id = %self.id,
                    user_id = %user_id,
                    room_id = %room_id,
                    "Connection joined room"
                );
                self.confirm_and_announce(&user_id, &room_id);
            }
            JoinOutcome::Rejoined => {
                debug!(connection_id = %self.id, room_id = %room_id, "Re-join of current room, confirming again");
                let confirmation = StatusEnvelope::joined_confirmed(user_id.clone());
                self.registry
                    .send_to(self.id, OutboundFrame::Text(confirmation.to_json()));
            }
            JoinOutcome::Migrated { previous_room } => {
                info!(
                    connection_id = %self.id,
                    user_id = %user_id,
                    from = %previous_room,
                    to = %room_id,
                    "Connection migrated rooms"
                );
                let left = StatusEnvelope::user_left(user_id.clone(), previous_room.clone());
                self.broadcaster
                    .broadcast_text(&previous_room, &left.to_json(), self.id);
                self.confirm_and_announce(&user_id, &room_id);
            }
            JoinOutcome::UnknownConnection => {
                // Raced with an eviction; the pump is about to wind down
                debug!(connection_id = %self.id, "Join from unregistered connection, ignoring");
                return;
            }
        }

        self.state = SessionState::InRoom { user_id, room_id };
    }

    /// Confirms the join to the joining connection only, then announces the
    /// new member to the rest of the room.
    fn confirm_and_announce(&self, user_id: &str, room_id: &str) {
        let confirmation = StatusEnvelope::joined_confirmed(user_id.to_string());
        self.registry
            .send_to(self.id, OutboundFrame::Text(confirmation.to_json()));

        let announcement = StatusEnvelope::user_joined(user_id.to_string(), room_id.to_string());
        self.broadcaster
            .broadcast_text(room_id, &announcement.to_json(), self.id);
    }

    fn handle_binary(&mut self, bytes: &[u8]) {
        let SessionState::InRoom { room_id, .. } = &self.state else {
            debug!(connection_id = %self.id, "Dropping binary frame received before join");
            return;
        };
        if bytes.is_empty() {
            debug!(connection_id = %self.id, "Dropping empty binary frame");
            return;
        }

        let room_id = room_id.clone();
        let report = self.broadcaster.broadcast_binary(&room_id, bytes, self.id);
        debug!(
            connection_id = %self.id,
            room_id = %room_id,
            bytes = bytes.len(),
            delivered = report.delivered,
            failed = report.failed,
            "Relayed binary frame"
        );
    }
}
