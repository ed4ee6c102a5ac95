use thiserror::Error;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using a WebSocket connection.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("frame: {0}")]
    Frame(#[from] FrameError),

    #[error("handshake: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),
}

/// Frame encoding/decoding errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown opcode 0x{0:X}")]
    UnknownOpcode(u8),

    #[error("incomplete frame: need {needed} bytes, have {available}")]
    Incomplete { needed: usize, available: usize },

    #[error("payload length {len} exceeds maximum {max}")]
    TooLarge { len: u64, max: u64 },
}

/// Opening handshake errors.
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("server rejected upgrade with status {status} {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Sec-WebSocket-Accept does not match the request key")]
    KeyMismatch,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Connection lifecycle errors.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("connection closed by peer")]
    Closed,

    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::client::State,
    },
}

impl Error {
    /// Short category name, used as a structured field when logging failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUri(_) => "invalid_uri",
            Self::Frame(FrameError::UnknownOpcode(_)) => "unknown_opcode",
            Self::Frame(_) => "frame",
            Self::Handshake(HandshakeError::Rejected { .. }) => "handshake_rejected",
            Self::Handshake(HandshakeError::KeyMismatch) => "handshake_key_mismatch",
            Self::Handshake(_) => "handshake",
            Self::Connection(ConnectionError::Closed) => "connection_closed",
            Self::Connection(_) => "invalid_state",
            Self::Transport(_) => "transport",
        }
    }
}
