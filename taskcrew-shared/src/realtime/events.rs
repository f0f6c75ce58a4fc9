/// Event types delivered over team channels

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Kinds of mutation events broadcast to a team's subscribers
///
/// The wire names match the events the client listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A task was created in the team
    TaskCreated,

    /// A task in the team was updated
    TaskUpdated,

    /// A comment was added to one of the team's tasks
    NewComment,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskCreated => "task_created",
            EventKind::TaskUpdated => "task_updated",
            EventKind::NewComment => "new_comment",
        }
    }
}

/// A single event published to a team channel
///
/// Serializes to the frame subscribers receive:
/// `{"event": "task_updated", "teamId": "...", "payload": {...}}`.
/// The payload is free-form JSON echoed to every subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEvent {
    /// What happened
    #[serde(rename = "event")]
    pub kind: EventKind,

    /// The team whose channel carries the event
    pub team_id: Uuid,

    /// Free-form payload
    pub payload: JsonValue,
}

impl TeamEvent {
    pub fn new(kind: EventKind, team_id: Uuid, payload: JsonValue) -> Self {
        Self {
            kind,
            team_id,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let team_id = Uuid::new_v4();
        let event = TeamEvent::new(EventKind::TaskUpdated, team_id, json!({"title": "x"}));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "task_updated");
        assert_eq!(value["teamId"], team_id.to_string());
        assert_eq!(value["payload"]["title"], "x");
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::TaskCreated.as_str(), "task_created");
        assert_eq!(EventKind::TaskUpdated.as_str(), "task_updated");
        assert_eq!(EventKind::NewComment.as_str(), "new_comment");
    }
}
