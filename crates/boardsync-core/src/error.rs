//! Error types for boardsync

use thiserror::Error;

use crate::outbox::TargetType;

/// Result type alias using boardsync's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Boardsync error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("{target_type} {target_id} not found in the primary store")]
    TargetNotFound { target_type: TargetType, target_id: i64 },

    #[error("Outbox event {0} not found. Run `boardsync outbox list` to see recent events.")]
    OutboxEventNotFound(i64),

    // Index errors (E100-E199)
    #[error("Search on index '{index}' failed: {message}")]
    SearchExecution { index: String, message: String },

    #[error("Indexing into '{index}' failed: {message}")]
    IndexWrite { index: String, message: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Network error: {0}. Check that the search cluster is reachable.")]
    NetworkError(#[from] reqwest::Error),

    // Mapping errors (E200-E299)
    #[error("Failed to map aggregate to document: {0}")]
    Mapping(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Unknown value '{value}' stored in column '{column}'")]
    CorruptRow { column: &'static str, value: String },

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::TargetNotFound { .. } => "E001",
            Self::OutboxEventNotFound(_) => "E002",
            Self::SearchExecution { .. } => "E100",
            Self::IndexWrite { .. } => "E101",
            Self::InvalidDocument(_) => "E102",
            Self::NetworkError(_) => "E103",
            Self::Mapping(_) => "E200",
            Self::Serialization(_) => "E201",
            Self::DatabaseError(_) => "E400",
            Self::CorruptRow { .. } => "E401",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::OutboxEventNotFound(_) => Some("boardsync outbox list".to_string()),
            Self::SearchExecution { .. } | Self::NetworkError(_) => {
                Some("boardsync config get search.url".to_string())
            }
            Self::IndexWrite { .. } => Some("boardsync outbox requeue".to_string()),
            Self::ConfigError(_) => Some("boardsync config list".to_string()),
            _ => None,
        }
    }
}
