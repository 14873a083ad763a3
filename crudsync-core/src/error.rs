//! Error types for the form engine and its collaborators.

use thiserror::Error;

use crate::strategy::MutationKind;

/// Errors raised by a remote per-item API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// The API does not implement this mutation
    #[error("Remote {0} is not supported")]
    Unsupported(MutationKind),

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The server answered with an empty body where one was required
    #[error("{0}")]
    EmptyResponse(String),
}

impl RemoteError {
    /// HTTP status of the failure, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised by the aggregate-level persist function.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    #[error("Failed to write settings: {0}")]
    Io(String),

    #[error("Failed to encode settings: {0}")]
    Encode(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors surfaced by form engine operations.
///
/// Every variant leaves the settings aggregate exactly as it was before
/// the operation started.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrudError {
    /// The caller's validator rejected the draft
    #[error("{0}")]
    Validation(String),

    /// The index does not address an existing item
    #[error("No item at index {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The dedicated per-item call failed
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The whole-aggregate persist failed
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The item has no identity and the configuration refuses to fall back
    #[error("{0} has no name; cannot address it remotely")]
    MissingIdentity(String),
}

impl CrudError {
    /// Message shown in the form when a save fails.
    pub fn form_message(&self) -> String {
        let message = self.to_string();
        if message.is_empty() {
            "An unexpected error occurred".to_string()
        } else {
            message
        }
    }
}
