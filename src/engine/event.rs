use crate::Millis;
use serde::Serialize;

/// Domain event emitted by an engine decision.
///
/// Events are immutable, timestamped at creation, and delivered to a room's
/// subscribers in emission order, after the state push of the same action.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub name: String,
    pub data: serde_json::Value,
    pub at: Millis,
}

impl Event {
    pub fn new(name: &str, data: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            data,
            at: crate::now(),
        }
    }
}
