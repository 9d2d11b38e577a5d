//! Single transient status banner shared by the CLI flows.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Error,
    Success,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tone::Info => "info",
            Tone::Error => "error",
            Tone::Success => "success",
        })
    }
}

/// The banner currently on display. `id` is a millisecond timestamp, bumped
/// if needed so later pushes always carry larger ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub id: i64,
    pub tone: Tone,
    pub text: String,
}

struct Inner {
    banner: Option<StatusMessage>,
    last_id: i64,
}

/// Holds at most one banner. A push replaces the current banner and clears
/// it after `ttl` unless a newer push or a `clear` came first.
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
}

impl StatusBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                banner: None,
                last_id: 0,
            })),
            ttl,
        }
    }

    pub fn banner(&self) -> Option<StatusMessage> {
        self.inner.lock().banner.clone()
    }

    /// Show `text`. Must be called inside a tokio runtime.
    pub fn push_message(&self, text: impl Into<String>, tone: Tone) -> StatusMessage {
        let message = {
            let mut inner = self.inner.lock();
            let id = chrono::Utc::now().timestamp_millis().max(inner.last_id + 1);
            inner.last_id = id;
            let message = StatusMessage {
                id,
                tone,
                text: text.into(),
            };
            inner.banner = Some(message.clone());
            message
        };
        match message.tone {
            Tone::Error => tracing::warn!(text = %message.text, "status"),
            _ => tracing::info!(tone = %message.tone, text = %message.text, "status"),
        }

        let inner = Arc::clone(&self.inner);
        let ttl = self.ttl;
        let id = message.id;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut inner = inner.lock();
            if inner.banner.as_ref().is_some_and(|b| b.id == id) {
                inner.banner = None;
            }
        });
        message
    }

    pub fn clear(&self) {
        self.inner.lock().banner = None;
    }
}
