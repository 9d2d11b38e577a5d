/// Failures reported by a transport implementation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    // Retryable
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("channel closed")]
    ChannelClosed,

    // Fatal for this identity
    #[error("peer id already taken: {0}")]
    IdTaken(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PeerUnavailable(_) | Self::Network(_) | Self::ChannelClosed
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::PeerUnavailable(_) => "peer_unavailable",
            Self::Network(_) => "network",
            Self::ChannelClosed => "channel_closed",
            Self::IdTaken(_) => "id_taken",
            Self::Protocol(_) => "protocol",
        }
    }
}

/// Why a connection manager operation could not proceed. Never returned
/// from the public operations; recorded in the snapshot's `error` instead.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("peer is not ready")]
    NotReady,
    #[error("remote peer id missing")]
    MissingTarget,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SessionError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::MissingTarget => "missing_target",
            Self::Transport(e) => e.error_kind(),
        }
    }
}
