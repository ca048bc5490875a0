//! Error handling module for the SaleCycle tag
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every fallible library operation returns these types.

use thiserror::Error;

use crate::render::RenderTransitionError;

/// Main error type for the SaleCycle tag
#[derive(Error, Debug)]
pub enum SaleCycleError {
    /// A caller passed an unusable argument (blank variable name, non-finite amount)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Mandatory configuration or page state is missing at render time,
    /// or a configuration file failed validation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Strict insert of a page variable that is already present
    #[error("Page variable '{0}' is already set")]
    DuplicateVariable(String),

    /// Render stage machine was driven out of order
    #[error("Render transition error: {0}")]
    RenderTransition(#[from] RenderTransitionError),

    /// IO errors (configuration files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for SaleCycle operations
pub type Result<T> = std::result::Result<T, SaleCycleError>;

// Convenient error constructors
impl SaleCycleError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns true for errors raised by render-time validation
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
