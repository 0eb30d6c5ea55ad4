//! Unified error type for the panel backend.

use thiserror::Error;

/// All errors that can surface from panel operations.
#[derive(Error, Debug)]
pub enum GitPanelError {
    /// I/O error (subprocess spawn, durable storage access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// git exited non-zero for a reason other than a missing revision
    #[error("git command failed: {0}")]
    GitInvocation(String),

    /// git produced non-UTF-8 output
    #[error("git output is not valid UTF-8: {0}")]
    GitOutput(#[from] std::string::FromUtf8Error),

    /// Serialization/deserialization error (bincode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON error on the message channel or the project index
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to load a durable blob — caller treats this as a cache miss
    #[error("Failed to load {path}: {message}")]
    StorageLoad { path: String, message: String },

    /// No workspace folder to operate on — fatal at initialization
    #[error("No workspace folder available")]
    NoWorkspace,

    /// Argument validation error
    #[error("{0}")]
    InvalidArgs(String),
}

pub type Result<T> = std::result::Result<T, GitPanelError>;
