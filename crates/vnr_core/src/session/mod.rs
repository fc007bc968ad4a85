//! Processing session: the state machine at the heart of the application.
//!
//! A session owns the engine handle and coordinates one run at a time:
//!
//! ```text
//! select_file -> start -> LoadingEngine -> Processing -> Done
//!                              |               |
//!                              +---> Error <---+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vnr_core::session::ProcessingSession;
//! use vnr_core::models::SourceAsset;
//!
//! let mut session = ProcessingSession::new(Box::new(engine));
//! session.select_file(SourceAsset::new("clip.mov", "video/quicktime", bytes));
//! session.start()?;
//! let processed = session.result().expect("run succeeded");
//! ```

mod errors;
pub mod filter;
mod pipeline;
mod state;

pub use errors::{SessionError, SessionResult};
pub use pipeline::{ProcessingSession, SessionEvent, SessionEventCallback};
pub use state::SessionState;
