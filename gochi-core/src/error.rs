//! Error types for the Gochi pet engine.
//!
//! This module provides a unified error type for all operations in the
//! gochi-core library, including state persistence, task list input
//! validation, and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gochi-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read the pet state file from disk.
    #[error("failed to read pet state '{path}': {source}")]
    StateRead {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the pet state file to disk.
    #[error("failed to write pet state '{path}': {source}")]
    StateWrite {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the pet state record.
    #[error("failed to encode pet state: {source}")]
    StateEncode {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A task was submitted with no text.
    #[error("task cannot be empty")]
    EmptyTask,

    /// A task index did not refer to an existing task.
    #[error("invalid task index: {index} (have {len} tasks)")]
    InvalidTaskIndex {
        /// The index the caller asked for.
        index: usize,
        /// Number of tasks in the list.
        len: usize,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl Error {
    /// Create a new `ConfigError` with the given message.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for gochi-core operations.
pub type Result<T> = std::result::Result<T, Error>;
