use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::registry::RoomSnapshot;
use crate::shared::AppState;

/// Participant count for one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantCount {
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub participants: usize,
}

/// Read-only query routes for external health/ops tooling.
/// These never mutate relay state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/rooms", get(list_rooms))
        .route("/rooms/:room_id/participants", get(room_participants))
}

/// GET /rooms
/// Returns every open room with its member count
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSnapshot>> {
    let rooms = state.registry.room_snapshot();
    debug!(room_count = rooms.len(), "Room snapshot served");
    Json(rooms)
}

/// GET /rooms/{room_id}/participants
/// Returns 0 for rooms that do not exist rather than a 404, so pollers
/// see a uniform shape
#[instrument(name = "room_participants", skip(state))]
pub async fn room_participants(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Json<ParticipantCount> {
    let participants = state.registry.participant_count(&room_id);
    Json(ParticipantCount {
        room_id,
        participants,
    })
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
