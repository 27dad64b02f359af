//! Error types for the prtracker_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for prtracker_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Storage error (constraint violation, I/O failure inside SQLite)
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected user action; no state was mutated
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Session has already been finished or abandoned
    #[error("Session is no longer in progress")]
    SessionClosed,

    /// Exercise position outside the in-session list
    #[error("No exercise at position {0}")]
    NoSuchExercise(usize),

    /// Set position outside an exercise's set list
    #[error("No set {set} for exercise {exercise}")]
    NoSuchSet { exercise: usize, set: usize },

    /// Schema migration step failure
    #[error("Migration error: {0}")]
    Migration(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors the user can fix by changing their input
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
