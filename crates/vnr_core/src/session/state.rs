//! Observable state of a processing session.

use crate::models::{ProcessedAsset, SessionPhase};

use super::errors::SessionError;

/// Snapshot of everything the presentation layer needs to render.
///
/// Held behind a lock inside the session because engine events update the
/// progress fraction from the engine's reader threads while an invocation
/// is in flight.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Fractional progress of the current run, always within [0, 1].
    pub progress: f32,
    /// Result of the last successful run.
    pub result: Option<ProcessedAsset>,
    /// Detail of the last failed run.
    pub error: Option<SessionError>,
}

impl SessionState {
    /// Record a progress report, clamping to [0, 1].
    ///
    /// Non-finite reports are dropped; the engine may emit garbage around
    /// filter-graph boundaries.
    pub fn apply_progress(&mut self, fraction: f32) {
        if fraction.is_finite() {
            self.progress = fraction.clamp(0.0, 1.0);
        }
    }

    /// Reset for a fresh source selection: discard any prior result and
    /// error, return to `Idle` with zero progress.
    pub fn reset_for_selection(&mut self) {
        self.phase = SessionPhase::Idle;
        self.progress = 0.0;
        self.result = None;
        self.error = None;
    }

    /// User-readable error message, if the last run failed.
    pub fn error_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(|e| e.user_message())
    }
}
