//! Error types for taskdeck operations

use thiserror::Error;

/// Client-side validation errors, raised before anything reaches the remote.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    #[error("{field} is too long: {len} characters (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} is unchanged")]
    Unchanged { field: &'static str },

    #[error("Invalid page: {reason}")]
    InvalidPage { reason: String },
}

/// Errors converting between the wire representation and domain types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("Timestamp out of range: {field}")]
    TimestampOutOfRange { field: &'static str },

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),
}

/// Failure of a call to the remote store.
///
/// The coordinator treats every variant identically; the split only exists so
/// messages and logs can tell connectivity trouble from a refused request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("{message}")]
    Rejected { message: String },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Message suitable for an inline error or a notification.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message } | Self::Rejected { message } => message,
        }
    }
}

impl From<WireError> for RemoteError {
    fn from(err: WireError) -> Self {
        Self::rejected(format!("Malformed response: {}", err))
    }
}

/// Master error type for all taskdeck core errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskdeckError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Result type alias for taskdeck operations.
pub type TaskdeckResult<T> = Result<T, TaskdeckError>;
