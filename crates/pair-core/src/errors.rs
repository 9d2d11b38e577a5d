/// Failures of the URL payload codec. Never panics on hostile input.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("empty payload")]
    Empty,
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("unsupported codec version {0}")]
    UnsupportedVersion(u8),
    #[error("corrupt compressed payload: {0}")]
    Compression(String),
    #[error("invalid payload JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Base64(_) => "base64",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::Compression(_) => "compression",
            Self::Json(_) => "json",
        }
    }
}

impl From<base64::DecodeError> for CodecError {
    fn from(e: base64::DecodeError) -> Self {
        CodecError::Base64(e.to_string())
    }
}
