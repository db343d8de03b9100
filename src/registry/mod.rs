// Public API
pub use membership::RoomRegistry;
pub use types::{
    ConnectionId, EvictedConnection, JoinOutcome, LeaveOutcome, LivenessSweep, OutboundFrame,
    Recipient, RoomSnapshot,
};

// Internal modules
mod membership;
mod types;
