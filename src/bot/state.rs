use serde::{Deserialize, Serialize};

/// Represents the current state of the user dialogue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum State {
    /// No interaction in progress; registered deliveries still fire
    #[default]
    Idle,
    /// The bot asked for a delivery time and waits for an `HH:MM` reply
    AwaitingTime,
}
