// Public API
pub use envelope::{ControlEnvelope, StatusAction, StatusEnvelope};
pub use handler::relay_handler;
pub use session::{Session, SessionState};
pub use socket::{Connection, RelaySocket, SocketError, SocketEvent};

// Internal modules
mod envelope;
mod handler;
mod session;
mod socket;
