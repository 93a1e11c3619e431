use super::error::Reject;
use serde::Deserialize;
use serde::Serialize;

/// Inbound command envelope: the edge authenticates the user and forwards
/// (action, payload) opaquely. Action names match case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub user: String,
    pub action: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Command {
    pub fn new(user: &str, action: &str) -> Self {
        Self {
            user: user.to_string(),
            action: action.to_string(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn is(&self, action: &str) -> bool {
        self.action.eq_ignore_ascii_case(action)
    }

    /// Small non-negative integer payload field, e.g. a token or tile index.
    pub fn index(&self, field: &str) -> Result<usize, Reject> {
        self.payload
            .get(field)
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .ok_or_else(|| Reject::invalid(format!("missing or non-integer {}", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_matching_ignores_case() {
        let command = Command::new("alice", "ROLL");
        assert!(command.is("roll") == true);
        assert!(command.is("Roll") == true);
        assert!(command.is("move") == false);
    }

    #[test]
    fn index_parses_payload_field() {
        let command = Command::new("alice", "move").with(serde_json::json!({ "tokenIndex": 2 }));
        assert!(command.index("tokenIndex").unwrap() == 2);
        assert!(command.index("tileIndex").is_err());
    }

    #[test]
    fn index_rejects_non_integer() {
        let command = Command::new("alice", "move").with(serde_json::json!({ "tokenIndex": "two" }));
        assert!(command.index("tokenIndex").is_err());
    }
}
