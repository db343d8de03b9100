use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Stable identifier for one client connection.
///
/// Rooms hold these instead of transport handles, so membership bookkeeping
/// stays decoupled from the socket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Frame queued for a connection's outbound pump
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
    /// Liveness probe
    Ping,
    /// Hard close: the pump drops the socket without a close handshake
    Terminate,
}

/// Result of joining a room
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// Inserted into the room (created if absent)
    Joined,
    /// Already a member of this room; nothing changed
    Rejoined,
    /// Atomically moved out of another room, which the caller should notify
    Migrated { previous_room: String },
    /// Connection is not registered (already evicted)
    UnknownConnection,
}

/// Result of leaving a room
#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    /// Removed from the room; `room_deleted` is set when the last member left
    Left { room_id: String, room_deleted: bool },
    /// Connection had no room membership
    NotInRoom,
}

/// Broadcast target snapshotted from a room's member set
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<OutboundFrame>,
}

/// Read-only view of one room, served by the monitoring surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub participants: usize,
}

/// Connection removed by a liveness sweep
#[derive(Debug, Clone)]
pub struct EvictedConnection {
    pub id: ConnectionId,
    pub user_id: Option<String>,
    pub room_id: Option<String>,
}

/// Summary of one liveness sweep
#[derive(Debug, Default)]
pub struct LivenessSweep {
    pub evicted: Vec<EvictedConnection>,
    pub probed: usize,
}
