//! JSON frames spoken on the relay WebSocket, tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client to relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Open `channel` to the peer registered as `target`.
    Dial { channel: String, target: String },
    Data { channel: String, payload: Value },
    Close { channel: String },
}

/// Relay to client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    /// Registration succeeded under `id`.
    Open { id: String },
    /// `from` dialed us on `channel`.
    Incoming { channel: String, from: String },
    /// Our dial on `channel` reached its target.
    Accepted { channel: String },
    Data { channel: String, payload: Value },
    Closed { channel: String },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
        message: String,
    },
}

impl RelayFrame {
    pub fn error(channel: Option<&str>, message: impl Into<String>) -> Self {
        Self::Error {
            channel: channel.map(str::to_string),
            message: message.into(),
        }
    }
}
