//! Error types for Chatflow.
//!
//! All errors in Chatflow are represented by the `ChatflowError` enum.
//! Editor validation failures never touch the document they were raised
//! against; store failures leave the in-memory document intact.
//!
//! Runtime conditions such as unmatched input or a dangling transition are
//! not errors; they are reported as `runtime::Outcome` variants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Chatflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum ChatflowError {
    /// Engine-level errors (startup, wiring).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// A step with this id already exists.
    #[error("step '{0}' already exists")]
    DuplicateStep(String),

    /// Step ids must be non-empty.
    #[error("step id must not be empty")]
    EmptyStepId,

    /// No step with this id exists.
    #[error("step '{0}' not found")]
    StepNotFound(String),

    /// Option index out of range for a step.
    #[error("option {index} not found on step '{step}'")]
    OptionNotFound {
        step: String,
        index: usize,
    },

    /// Refused to delete the only remaining step.
    #[error("step '{0}' is the last step and cannot be deleted")]
    LastStep(String),

    /// No edge with this id exists in the graph view.
    #[error("edge '{0}' not found")]
    EdgeNotFound(String),

    /// Flow metadata failed validation.
    #[error("{0}")]
    InvalidMeta(String),

    /// Event queue errors.
    #[error("{0}")]
    Queue(String),

    /// Persistence (load/save) errors.
    #[error("{0}")]
    Store(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<std::io::Error> for ChatflowError {
    fn from(error: std::io::Error) -> Self {
        ChatflowError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for ChatflowError {
    fn from(error: serde_json::Error) -> Self {
        ChatflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for ChatflowError {
    fn from(error: toml::de::Error) -> Self {
        ChatflowError::Config(error.to_string())
    }
}
