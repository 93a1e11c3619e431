use super::error::Reject;
use super::event::Event;
use crate::Coins;
use crate::Millis;
use crate::Seat;
use crate::room::RoomId;
use crate::room::RoomMeta;
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of a room handed to the lobby and broadcast to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub room: RoomId,
    pub game: String,
    pub meta: RoomMeta,
    pub state: serde_json::Value,
    pub legal: Vec<String>,
}

/// Summary attached to the result when an action ends the game; the outer
/// economy settles wallets from this record plus the `Transaction` events.
#[derive(Debug, Clone, Serialize)]
pub struct Finish {
    pub room: RoomId,
    pub game: String,
    pub seats: BTreeMap<String, Seat>,
    pub winner: Option<String>,
    pub entry_fee: Coins,
    pub turn_started_at: Millis,
    pub winners: Vec<String>,
}

/// Result of one `execute`.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub error: Option<String>,
    pub broadcast: bool,
    pub state: Option<StateView>,
    pub events: Vec<Event>,
    pub over: Option<Finish>,
}

impl Outcome {
    pub fn rejected(reject: Reject) -> Self {
        Self {
            success: false,
            error: Some(reject.to_string()),
            broadcast: false,
            state: None,
            events: Vec::new(),
            over: None,
        }
    }

    /// Internal failure that is neither the caller's fault nor retryable
    /// busy-ness; operator attention expected.
    pub fn broken(reason: &str) -> Self {
        Self {
            success: false,
            error: Some(reason.to_string()),
            broadcast: false,
            state: None,
            events: Vec::new(),
            over: None,
        }
    }

    /// Successful mutation with nothing to tell the room about.
    pub fn quiet() -> Self {
        Self {
            success: true,
            error: None,
            broadcast: false,
            state: None,
            events: Vec::new(),
            over: None,
        }
    }
}
