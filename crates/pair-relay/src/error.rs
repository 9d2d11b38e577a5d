use pair_session::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("peer id already taken: {0}")]
    IdTaken(String),
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("channel id already in use: {0}")]
    ChannelTaken(String),
    #[error("malformed frame: {0}")]
    BadFrame(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Code carried in `error` frames.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IdTaken(_) => codes::ID_TAKEN,
            Self::PeerUnavailable(_) => codes::PEER_UNAVAILABLE,
            Self::UnknownChannel(_) => codes::UNKNOWN_CHANNEL,
            Self::ChannelTaken(_) => codes::CHANNEL_TAKEN,
            Self::BadFrame(_) => codes::BAD_FRAME,
            Self::Io(_) => "io",
        }
    }
}

pub mod codes {
    pub const ID_TAKEN: &str = "id-taken";
    pub const PEER_UNAVAILABLE: &str = "peer-unavailable";
    pub const UNKNOWN_CHANNEL: &str = "unknown-channel";
    pub const CHANNEL_TAKEN: &str = "channel-taken";
    pub const BAD_FRAME: &str = "bad-frame";
}

/// Map an `error` frame code back into the transport taxonomy.
pub fn transport_error(code: &str, subject: &str) -> TransportError {
    match code {
        codes::ID_TAKEN => TransportError::IdTaken(subject.to_string()),
        codes::PEER_UNAVAILABLE => TransportError::PeerUnavailable(subject.to_string()),
        codes::UNKNOWN_CHANNEL => TransportError::ChannelClosed,
        other => TransportError::Protocol(other.to_string()),
    }
}
