//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a processing session.
///
/// Valid transitions:
///
/// ```text
/// Idle -> LoadingEngine -> Processing -> Done
///              |                |
///              +----> Error <---+
/// ```
///
/// A new run may only be started from `Idle` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No run in flight; a source may or may not be selected.
    #[default]
    Idle,
    /// The engine handle is being initialized.
    LoadingEngine,
    /// The filter invocation is in flight.
    Processing,
    /// A processed asset is available.
    Done,
    /// The last run failed; the user may retry.
    Error,
}

impl SessionPhase {
    /// Whether a new run may be started from this phase.
    pub fn can_start(&self) -> bool {
        matches!(self, SessionPhase::Idle | SessionPhase::Error)
    }

    /// Whether a run is currently in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionPhase::LoadingEngine | SessionPhase::Processing)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::LoadingEngine => write!(f, "loading_engine"),
            SessionPhase::Processing => write!(f, "processing"),
            SessionPhase::Done => write!(f, "done"),
            SessionPhase::Error => write!(f, "error"),
        }
    }
}

/// Kind of session failure, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Engine bootstrap failed before any invocation.
    EngineLoad,
    /// The filter invocation failed after the engine was ready.
    Processing,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::EngineLoad => write!(f, "engine_load"),
            ErrorKind::Processing => write!(f, "processing"),
        }
    }
}
