use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::shared::AppState;

use super::session::Session;
use super::socket::Connection;

/// WebSocket endpoint for the relay
///
/// GET /ws - upgrades and runs the connection until disconnect. Frames above
/// the configured payload bound surface as a transport error and close the
/// connection.
pub async fn relay_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let ws = ws
        .max_message_size(state.config.max_payload_bytes)
        .max_frame_size(state.config.max_payload_bytes);
    ws.on_upgrade(move |socket| handle_relay_connection(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_relay_connection(socket: axum::extract::ws::WebSocket, state: AppState) {
    // Outbound channel (relay -> client); the registry owns the sender
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel();
    let connection_id = state.registry.register(outbound_sender);

    info!(connection_id = %connection_id, "WebSocket connection established");

    let session = Session::new(
        connection_id,
        Arc::clone(&state.registry),
        state.broadcaster.clone(),
        state.config.default_room.clone(),
    );
    let connection = Connection::new(Box::new(socket), outbound_receiver, session);

    // Run until disconnect; teardown happens inside the pump
    connection.run().await;

    info!(connection_id = %connection_id, "WebSocket connection closed");
}
