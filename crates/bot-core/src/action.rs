//! Outbound command model and its wire encoding.

use serde_json::{json, Value};

/// Action codes as the runner's `SendPlayerAction` call expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerActions {
    Forward = 1,
    Stop = 2,
    StartAfterburner = 3,
    StopAfterburner = 4,
}

impl PlayerActions {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// The command computed for one tick. `heading` only matters for
/// [`PlayerActions::Forward`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAction {
    pub player_id: String,
    pub action: PlayerActions,
    pub heading: i32,
}

impl PlayerAction {
    /// Encodes into the mapping the runner expects. Total: every action
    /// value has a wire form.
    pub fn to_wire(&self) -> Value {
        json!({
            "PlayerId": self.player_id,
            "Heading": self.heading,
            "Action": self.action.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_match_the_wire_protocol() {
        assert_eq!(PlayerActions::Forward.code(), 1);
        assert_eq!(PlayerActions::Stop.code(), 2);
        assert_eq!(PlayerActions::StartAfterburner.code(), 3);
        assert_eq!(PlayerActions::StopAfterburner.code(), 4);
    }

    #[test]
    fn wire_encoding_carries_all_three_fields() {
        let action = PlayerAction {
            player_id: "abc".to_string(),
            action: PlayerActions::StartAfterburner,
            heading: 271,
        };

        let wire = action.to_wire();
        assert_eq!(wire["PlayerId"], json!("abc"));
        assert_eq!(wire["Heading"], json!(271));
        assert_eq!(wire["Action"], json!(3));
    }
}
