//! Error types for the processing session.
//!
//! The session catches every engine failure at its boundary and normalizes
//! it into this two-kind taxonomy; raw engine errors never reach the
//! presentation layer. Both kinds are terminal for the current run but
//! non-fatal to the application.

use thiserror::Error;

use crate::models::ErrorKind;

/// A failed processing run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Engine bootstrap failed; the engine was never invoked.
    #[error("failed to load processing engine: {message}")]
    EngineLoad { message: String },

    /// The invocation failed after the engine was ready.
    #[error("processing failed: {message}")]
    Processing { message: String },
}

impl SessionError {
    /// Create an engine-load failure.
    pub fn engine_load(message: impl Into<String>) -> Self {
        Self::EngineLoad {
            message: message.into(),
        }
    }

    /// Create a processing failure.
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Which kind of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::EngineLoad { .. } => ErrorKind::EngineLoad,
            SessionError::Processing { .. } => ErrorKind::Processing,
        }
    }

    /// Short message suitable for direct display.
    ///
    /// The underlying detail stays available through `Display` for logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::EngineLoad { .. } => {
                "Failed to load the processing engine. The host environment may not support it."
            }
            SessionError::Processing { .. } => "An error occurred during processing.",
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
