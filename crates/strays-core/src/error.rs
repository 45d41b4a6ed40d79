//! Error types for the Strays update engine
//!
//! One enum covers both the caller-facing taxonomy (what a controller turns
//! into a response) and the collaborator failures the coordinator folds into
//! it.

use thiserror::Error;

/// Result type alias for Strays operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the Strays update engine
#[derive(Error, Debug)]
pub enum Error {
    /// No requester could be resolved for the call
    #[error("Authentication required")]
    Unauthenticated,

    /// Entity absent or inactive
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every field in the update was skipped
    ///
    /// Rule-absent, validation-failed and authorization-failed fields are
    /// deliberately not told apart here.
    #[error("Invalid update: no field could be applied")]
    InvalidUpdate,

    /// Whole-operation ownership check failed (e.g. deactivation)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Persistence or notification failure after the update was accepted
    #[error("Internal error: {0}")]
    Internal(String),

    /// No rule set registered for the entity type
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Persistence collaborator failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Notification collaborator failure
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input at the parsing boundary
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an unknown entity type error
    pub fn unknown_entity_type(kind: impl Into<String>) -> Self {
        Self::UnknownEntityType(kind.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Stable machine-readable code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "AUTH",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidUpdate => "INVALID_UPDATE",
            Self::Forbidden(_) => "AUTH_FORBIDDEN",
            Self::InvalidInput(_) | Self::Json(_) => "INVALID_PARAMS",
            Self::UnknownEntityType(_) => "UNKNOWN_ENTITY_TYPE",
            Self::Internal(_)
            | Self::Persistence(_)
            | Self::Notification(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Other(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// HTTP-style status a controller should answer with
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::InvalidUpdate | Self::InvalidInput(_) | Self::Json(_) => 400,
            _ => 500,
        }
    }

    /// Whether the error belongs to the caller-facing taxonomy rather than a
    /// raw collaborator failure
    pub fn is_caller_facing(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated
                | Self::NotFound(_)
                | Self::InvalidUpdate
                | Self::Forbidden(_)
                | Self::Internal(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
