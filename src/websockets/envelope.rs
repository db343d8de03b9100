use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status actions used by the join protocol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Joined,
    JoinedConfirmed,
    UserJoined,
    UserLeft,
}

/// Inbound control envelope, parsed loosely.
///
/// Only the discriminators and join fields are pulled out; everything else in
/// the payload is left alone because non-join traffic is relayed verbatim.
/// A frame without a string `type` field is a protocol error.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub action: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

impl ControlEnvelope {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// True for a `status`/`joined` join request
    pub fn is_join_request(&self) -> bool {
        self.kind == "status" && self.action.as_deref() == Some("joined")
    }
}

/// Outbound status envelope with a server timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub action: StatusAction,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "roomId", skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEnvelope {
    fn new(action: StatusAction, user_id: String, room_id: Option<String>) -> Self {
        Self {
            kind: "status".to_string(),
            action,
            user_id,
            room_id,
            timestamp: Utc::now(),
        }
    }

    /// Sent to the joining connection only
    pub fn joined_confirmed(user_id: String) -> Self {
        Self::new(StatusAction::JoinedConfirmed, user_id, None)
    }

    /// Broadcast to the rest of the room after a join
    pub fn user_joined(user_id: String, room_id: String) -> Self {
        Self::new(StatusAction::UserJoined, user_id, Some(room_id))
    }

    /// Broadcast to the remaining members after a leave or eviction
    pub fn user_left(user_id: String, room_id: String) -> Self {
        Self::new(StatusAction::UserLeft, user_id, Some(room_id))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_request() {
        let envelope = ControlEnvelope::parse(
            r#"{"type":"status","action":"joined","userId":"u1","roomId":"debate"}"#,
        )
        .unwrap();

        assert!(envelope.is_join_request());
        assert_eq!(envelope.user_id.as_deref(), Some("u1"));
        assert_eq!(envelope.room_id.as_deref(), Some("debate"));
    }

    #[test]
    fn test_parse_tolerates_unknown_fields() {
        let envelope =
            ControlEnvelope::parse(r#"{"type":"control","volume":11,"nested":{"a":1}}"#).unwrap();

        assert_eq!(envelope.kind, "control");
        assert!(!envelope.is_join_request());
    }

    #[test]
    fn test_parse_rejects_missing_or_nonstring_type() {
        assert!(ControlEnvelope::parse(r#"{"action":"joined"}"#).is_err());
        assert!(ControlEnvelope::parse(r#"{"type":42}"#).is_err());
        assert!(ControlEnvelope::parse("not json at all").is_err());
    }

    #[test]
    fn test_status_is_not_a_join_without_the_action() {
        let envelope = ControlEnvelope::parse(r#"{"type":"status","action":"typing"}"#).unwrap();
        assert!(!envelope.is_join_request());
    }

    #[test]
    fn test_joined_confirmed_wire_shape() {
        let json = StatusEnvelope::joined_confirmed("u1".to_string()).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "status");
        assert_eq!(value["action"], "joined_confirmed");
        assert_eq!(value["userId"], "u1");
        assert!(value["timestamp"].is_string());
        // No room id on confirmations
        assert!(value.get("roomId").is_none());
    }

    #[test]
    fn test_membership_notifications_carry_the_room() {
        let joined = StatusEnvelope::user_joined("u1".to_string(), "debate".to_string());
        let left = StatusEnvelope::user_left("u1".to_string(), "debate".to_string());

        let joined: serde_json::Value = serde_json::from_str(&joined.to_json()).unwrap();
        let left: serde_json::Value = serde_json::from_str(&left.to_json()).unwrap();

        assert_eq!(joined["action"], "user_joined");
        assert_eq!(left["action"], "user_left");
        assert_eq!(joined["roomId"], "debate");
        assert_eq!(left["roomId"], "debate");
    }
}
