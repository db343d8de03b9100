use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use podium::{
    broadcast::Broadcaster,
    registry::{ConnectionId, OutboundFrame, RoomRegistry},
    websockets::{Session, SessionState, SocketEvent, StatusAction, StatusEnvelope},
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// One relay instance (registry + broadcaster), isolated per test
pub struct TestRelay {
    pub registry: Arc<RoomRegistry>,
    pub broadcaster: Broadcaster,
}

impl TestRelay {
    pub fn new() -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            registry,
            broadcaster,
        }
    }

    /// Registers a connection and wraps its session for scripted driving
    pub fn connect(&self) -> TestClient {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.registry.register(sender);
        let session = Session::new(
            id,
            Arc::clone(&self.registry),
            self.broadcaster.clone(),
            "main".to_string(),
        );
        TestClient {
            id,
            session,
            outbound: receiver,
        }
    }

    /// Connects, joins, and swallows the confirmation
    pub fn join_client(&self, user_id: &str, room_id: &str) -> TestClient {
        let mut client = self.connect();
        client.join(user_id, room_id);
        client.expect_status(StatusAction::JoinedConfirmed);
        client
    }
}

/// A scripted client: events go straight into the session state machine,
/// outbound frames are read back off the connection's queue
pub struct TestClient {
    pub id: ConnectionId,
    pub session: Session,
    outbound: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl TestClient {
    pub fn join(&mut self, user_id: &str, room_id: &str) {
        let request = json!({
            "type": "status",
            "action": "joined",
            "userId": user_id,
            "roomId": room_id,
        });
        self.send_text(&request.to_string());
    }

    pub fn send_text(&mut self, text: &str) {
        self.session.handle_event(SocketEvent::Text(text.to_string()));
    }

    pub fn send_binary(&mut self, bytes: &[u8]) {
        self.session.handle_event(SocketEvent::Binary(bytes.to_vec()));
    }

    pub fn pong(&mut self) {
        self.session.handle_event(SocketEvent::Pong);
    }

    pub fn disconnect(&mut self) {
        self.session.handle_event(SocketEvent::Closed);
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    /// Closes the outbound queue, simulating a recipient whose pump is gone
    pub fn break_transport(&mut self) {
        self.outbound.close();
    }

    pub fn next_frame(&mut self) -> Option<OutboundFrame> {
        self.outbound.try_recv().ok()
    }

    pub fn drain_frames(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub fn drain_texts(&mut self) -> Vec<String> {
        self.drain_frames()
            .into_iter()
            .filter_map(|frame| match frame {
                OutboundFrame::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Asserts the next frame is a status envelope with the given action
    pub fn expect_status(&mut self, action: StatusAction) -> StatusEnvelope {
        let frame = self.next_frame().expect("expected an outbound frame");
        let OutboundFrame::Text(text) = frame else {
            panic!("expected a text frame, got {:?}", frame);
        };
        let envelope: StatusEnvelope =
            serde_json::from_str(&text).expect("expected a status envelope");
        assert_eq!(envelope.action, action, "wrong status action");
        envelope
    }

    pub fn expect_silence(&mut self) {
        if let Some(frame) = self.next_frame() {
            panic!("expected no outbound frames, got {:?}", frame);
        }
    }
}
