//! Error types shared by the valuation bots.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the shared error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration-level failures.
///
/// These are the only errors allowed to end a run early; everything that
/// happens after the configuration is loaded is recovered closer to its origin.
#[derive(Error, Debug)]
pub enum Error {
    /// No configuration file at the resolved path
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Required section or key missing
    #[error("Missing configuration key: {0}")]
    MissingKey(String),

    /// Present but unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if the configuration file was missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if the configuration file was not valid JSON (or had the wrong shape).
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Json(_) => true,
            Self::WithContext { source, .. } => source.is_malformed(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
