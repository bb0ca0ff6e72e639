//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, JSON and XNAT failures, and provides semantic variants
//! for configuration validation and pipeline failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XNAT error: {0}")]
    Xnat(#[from] crate::io::XnatError),

    #[error("Unknown phantom type '{name}' (available: {available})")]
    UnknownPhantom { name: String, available: String },

    #[error("Pipeline {pipeline} got an unexpected option '{name}' (available: {available})")]
    UnknownOption {
        pipeline: String,
        name: String,
        available: String,
    },

    #[error("Study has no input '{key}'")]
    MissingInput { key: String },

    #[error("Scan '{scan}' not found in session {session}")]
    ScanNotFound { session: String, scan: String },

    #[error("Archive {what} '{value}' cannot be used as a directory name")]
    UnsafeId { what: &'static str, value: String },

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }
}
