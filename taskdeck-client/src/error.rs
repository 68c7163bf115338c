//! Error types for the client.

use crate::api_client::ApiClientError;
use crate::config::ConfigError;
use crate::persistence::PersistenceError;
use taskdeck_cache::CacheError;
use taskdeck_core::{RemoteError, ValidationError};

/// Failure of a coordinated mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl MutationError {
    /// Message to show inline, or `fallback` when the error carries none.
    pub fn inline_message(&self, fallback: &str) -> String {
        let message = match self {
            MutationError::Validation(err) => err.to_string(),
            MutationError::Remote(err) => err.message().to_string(),
        };
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error("Invalid argument: {0}")]
    Usage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{FAILED_TO_CREATE_PROJECT, FAILED_TO_CREATE_TASK};

    #[test]
    fn test_inline_message_prefers_remote_text() {
        let err = MutationError::from(RemoteError::rejected("Project name already exists"));
        assert_eq!(
            err.inline_message(FAILED_TO_CREATE_PROJECT),
            "Project name already exists"
        );
    }

    #[test]
    fn test_inline_message_falls_back_when_blank() {
        let err = MutationError::from(RemoteError::transport(""));
        assert_eq!(err.inline_message(FAILED_TO_CREATE_TASK), FAILED_TO_CREATE_TASK);
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = MutationError::from(ValidationError::RequiredFieldMissing { field: "title" });
        assert_eq!(
            err.inline_message(FAILED_TO_CREATE_TASK),
            "Required field missing: title"
        );
    }
}
