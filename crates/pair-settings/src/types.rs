//! Settings sections. Every section defaults field by field, so a settings
//! file only needs the values it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings object (`~/.pairlink/settings.json`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PairSettings {
    pub relay: RelaySettings,
    pub session: SessionSettings,
    pub status: StatusSettings,
    pub logging: LoggingSettings,
}

/// Where the relay lives, for clients, and how the relay binary binds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Host clients dial.
    pub host: String,
    pub port: u16,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    /// Base path the relay is mounted under. See [`normalize_path`].
    pub path: String,
    /// Address the relay server binds to.
    pub bind_host: String,
    /// Per-peer outbound frame queue on the relay.
    pub max_send_queue: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            secure: false,
            path: "/".to_string(),
            bind_host: "0.0.0.0".to_string(),
            max_send_queue: 256,
        }
    }
}

impl RelaySettings {
    /// WebSocket endpoint peers connect to, e.g. `ws://127.0.0.1:9000/peer`.
    pub fn endpoint(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}:{}{}peer", self.host, self.port, normalize_path(&self.path))
    }

    /// Endpoint with the peer id to register under, if any.
    pub fn peer_url(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}?id={id}", self.endpoint()),
            None => self.endpoint(),
        }
    }
}

/// Normalize a relay base path: leading and trailing `/`, and a trailing
/// `peer` endpoint segment removed so either form can be configured.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    let base = match trimmed.rsplit_once('/') {
        Some((head, "peer")) => head,
        None if trimmed == "peer" => "",
        _ => trimmed,
    };
    if base.is_empty() {
        "/".to_string()
    } else {
        format!("/{base}/")
    }
}

/// Guest reconnection policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Retry budget; 0 retries forever.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2500,
        }
    }
}

impl SessionSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusSettings {
    /// How long a status banner stays up.
    pub banner_ttl_ms: u64,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self { banner_ttl_ms: 3000 }
    }
}

impl StatusSettings {
    pub fn banner_ttl(&self) -> Duration {
        Duration::from_millis(self.banner_ttl_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
