use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use podium::registry::OutboundFrame;
use podium::websockets::{RelaySocket, SocketError, SocketEvent};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Scripted socket: events are fed in through a channel, frames pushed to the
/// client are recorded for assertions. No network involved.
pub struct MockSocket {
    events: mpsc::UnboundedReceiver<SocketEvent>,
    sent: Arc<Mutex<Vec<OutboundFrame>>>,
    closed_gracefully: Arc<Mutex<bool>>,
}

/// Test-side handle to a `MockSocket`
#[derive(Clone)]
pub struct MockSocketHandle {
    events: mpsc::UnboundedSender<SocketEvent>,
    sent: Arc<Mutex<Vec<OutboundFrame>>>,
    closed_gracefully: Arc<Mutex<bool>>,
}

impl MockSocket {
    pub fn new() -> (Self, MockSocketHandle) {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed_gracefully = Arc::new(Mutex::new(false));

        let socket = Self {
            events: event_receiver,
            sent: Arc::clone(&sent),
            closed_gracefully: Arc::clone(&closed_gracefully),
        };
        let handle = MockSocketHandle {
            events: event_sender,
            sent,
            closed_gracefully,
        };
        (socket, handle)
    }
}

impl MockSocketHandle {
    pub fn push_event(&self, event: SocketEvent) {
        self.events.send(event).expect("mock socket is gone");
    }

    pub fn sent_frames(&self) -> Vec<OutboundFrame> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closed_gracefully(&self) -> bool {
        *self.closed_gracefully.lock().unwrap()
    }
}

#[async_trait]
impl RelaySocket for MockSocket {
    async fn send_frame(&mut self, frame: OutboundFrame) -> Result<(), SocketError> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn next_event(&mut self) -> SocketEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => SocketEvent::Closed,
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        *self.closed_gracefully.lock().unwrap() = true;
        Ok(())
    }
}
