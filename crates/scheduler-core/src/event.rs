use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an [`Event`]; tracked for observability only — the
/// matching logic in [`crate::function::FunctionState`] does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Created,
    Ready,
    Undefined,
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Created
    }
}

/// An immutable fact posted to `/api/event`. `data` is opaque to the
/// scheduler: it is carried verbatim into invocation argument maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: EventStatus,
}

impl Event {
    pub fn new(name: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            data,
            created_at: Utc::now(),
            status: EventStatus::Created,
        }
    }
}
