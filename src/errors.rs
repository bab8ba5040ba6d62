//! Error types for the moodlog application.
//!
//! This module defines custom error types that categorize the failures
//! that can occur while capturing, persisting and reading mood entries.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the moodlog application.
#[derive(Error, Debug)]
pub enum MoodError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Mood rating outside of the 1-5 scale.
    #[error("Invalid mood value {value}: expected an integer from 1 to 5")]
    InvalidMood { value: i64 },

    /// Tag that is not part of the context tag vocabulary.
    #[error("Unknown context tag: {tag}")]
    UnknownTag { tag: String },

    /// The durable key-value store could not be read or written.
    #[error("Persistence failure for key '{key}': {message}")]
    Persistence { key: String, message: String },

    /// Entry was not found when performing an operation.
    #[error("Entry not found: {id}")]
    EntryNotFound { id: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },

    #[error("{message}")]
    EditorError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}
