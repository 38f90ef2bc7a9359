use thiserror::Error;

/// Fallback message when the server does not provide one.
pub const GENERIC_FAILURE: &str = "Something went wrong";

/// Errors returned by the API adapters and the stores built on them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-success HTTP status. `message` is the server's `message` field when present.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// A protected endpoint answered 401. The session has already been cleared.
    #[error("Session expired")]
    SessionExpired,
    #[error("Network error: {0}")]
    Network(String),
    /// The response body did not match the expected shape.
    #[error("Invalid response from {call}: {reason}")]
    InvalidResponse { call: String, reason: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
    #[error("Authenticator failed: {0}")]
    Authenticator(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn invalid_response(call: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidResponse {
            call: call.into(),
            reason: reason.to_string(),
        }
    }

    pub fn authenticator(msg: impl Into<String>) -> Self {
        Self::Authenticator(msg.into())
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

/// Errors from a persistence tier.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage is corrupted: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
