use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::registry::OutboundFrame;

use super::session::Session;

/// Transport-level events feeding the session state machine.
///
/// The state machine is independent of how the transport delivers these; in
/// tests they are fed from a script instead of a socket.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Text(String),
    Binary(Vec<u8>),
    /// Any liveness traffic (probe response or client-initiated ping)
    Pong,
    /// Stream closed, any code or reason
    Closed,
    /// Unrecoverable stream error; treated like a close
    Errored(String),
}

#[derive(Error, Debug)]
pub enum SocketError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Simple WebSocket abstraction - frames out, events in
#[async_trait]
pub trait RelaySocket: Send {
    /// Push one outbound frame to the client
    async fn send_frame(&mut self, frame: OutboundFrame) -> Result<(), SocketError>;

    /// Next transport event from the client
    async fn next_event(&mut self) -> SocketEvent;

    /// Graceful close handshake
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl RelaySocket for WebSocket {
    async fn send_frame(&mut self, frame: OutboundFrame) -> Result<(), SocketError> {
        let message = match frame {
            OutboundFrame::Text(text) => Message::Text(text),
            OutboundFrame::Binary(bytes) => Message::Binary(bytes),
            OutboundFrame::Ping => Message::Ping(Vec::new()),
            // Terminate never reaches the transport; the pump handles it
            OutboundFrame::Terminate => return Err(SocketError::ConnectionClosed),
        };
        self.send(message)
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn next_event(&mut self) -> SocketEvent {
        match self.next().await {
            Some(Ok(Message::Text(text))) => SocketEvent::Text(text),
            Some(Ok(Message::Binary(bytes))) => SocketEvent::Binary(bytes),
            // Client pings count as liveness traffic too
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => SocketEvent::Pong,
            Some(Ok(Message::Close(_))) => SocketEvent::Closed,
            Some(Err(e)) => SocketEvent::Errored(e.to_string()),
            None => SocketEvent::Closed,
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// A managed relay connection.
///
/// Pumps queued outbound frames to the client and feeds inbound transport
/// events into the session state machine until disconnect. A `Terminate`
/// frame drops the socket without the close handshake.
pub struct Connection {
    socket: Box<dyn RelaySocket>,
    outbound_receiver: mpsc::UnboundedReceiver<OutboundFrame>,
    session: Session,
}

impl Connection {
    pub fn new(
        socket: Box<dyn RelaySocket>,
        outbound_receiver: mpsc::UnboundedReceiver<OutboundFrame>,
        session: Session,
    ) -> Self {
        Self {
            socket,
            outbound_receiver,
            session,
        }
    }

    /// Run the connection - handles both directions until disconnect
    pub async fn run(mut self) {
        let mut hard_close = false;

        loop {
            tokio::select! {
                // Outbound frames (from the relay to the client)
                frame = self.outbound_receiver.recv() => {
                    match frame {
                        Some(OutboundFrame::Terminate) => {
                            debug!("Terminating connection without close handshake");
                            hard_close = true;
                            break;
                        }
                        Some(frame) => {
                            if let Err(e) = self.socket.send_frame(frame).await {
                                self.session.handle_event(SocketEvent::Errored(e.to_string()));
                                break;
                            }
                        }
                        None => break, // registry dropped the sender
                    }
                }

                // Inbound events (from the client to the relay)
                event = self.socket.next_event() => {
                    if self.session.handle_event(event) {
                        break;
                    }
                }
            }
        }

        // Idempotent: evicted connections are already unregistered
        self.session.close();

        if !hard_close {
            let _ = self.socket.close().await;
        }
    }
}
