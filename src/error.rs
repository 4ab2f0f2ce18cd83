use thiserror::Error;

/// Why a path could not be resolved. `Display` yields the reason string
/// reported inside preview payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("{0}")]
    Syntax(SyntaxFault),
    #[error("Name not found")]
    NameNotFound,
    #[error("{0}")]
    Lookup(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxFault {
    #[error("invalid start")]
    InvalidStart,
    #[error("invalid attribute")]
    InvalidAttribute,
    #[error("missing ]")]
    MissingBracket,
    #[error("unterminated string key")]
    UnterminatedKey,
    #[error("invalid index")]
    InvalidIndex,
    #[error("invalid character")]
    InvalidCharacter,
}

impl From<SyntaxFault> for PathError {
    fn from(fault: SyntaxFault) -> Self {
        PathError::Syntax(fault)
    }
}

/// Failures of the execution channel to the target session.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The snippet raised inside the target; carries the traceback text.
    #[error("{0}")]
    Remote(String),
    #[error("{0}")]
    Status(String),
    #[error("shell timeout: {0}")]
    ShellTimeout(String),
    #[error("empty payload")]
    EmptyPayload,
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("channel closed")]
    Closed,
    #[error("channel io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the debug preview socket.
#[derive(Debug, Error)]
pub enum DebugClientError {
    #[error("debug preview server unavailable")]
    Unavailable,
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),
    #[error("empty response")]
    EmptyResponse,
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
}
