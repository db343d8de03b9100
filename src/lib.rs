// Library crate for the podium relay server
// This file exposes the public API for integration tests

pub mod broadcast;
pub mod config;
pub mod heartbeat;
pub mod monitor;
pub mod registry;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use broadcast::{Broadcaster, DeliveryReport};
pub use config::{ConfigError, RelayConfig};
pub use registry::{ConnectionId, JoinOutcome, LeaveOutcome, OutboundFrame, RoomRegistry};
pub use shared::AppState;
pub use websockets::{
    Connection, RelaySocket, Session, SessionState, SocketEvent, StatusAction, StatusEnvelope,
};
