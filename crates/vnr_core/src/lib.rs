//! VNR Core - Backend logic for Video Noise Reducer
//!
//! This crate contains all business logic with zero UI dependencies.
//! It can be used by a GUI application or a CLI tool.
//!
//! The centerpiece is [`session::ProcessingSession`], a small state machine
//! that coordinates file intake, engine loading, the fixed noise-reduction
//! invocation, and result retrieval. The media engine itself is opaque and
//! reached only through the [`engine::Engine`] trait.

pub mod config;
pub mod engine;
pub mod logging;
pub mod models;
pub mod session;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
