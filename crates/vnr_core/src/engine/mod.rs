//! Abstraction over the embedded media-processing engine.
//!
//! The engine is a black box: it is loaded once, fed named byte buffers in
//! its virtual file space, invoked with a command-line-like argument list,
//! and read back. While an invocation is in flight it emits typed events
//! (raw diagnostic lines and fractional progress) to registered subscribers.
//!
//! The session core only ever talks to [`Engine`]; the concrete binding
//! lives in the `vnr_engine` crate, and tests inject a fake.

use thiserror::Error;

/// Event emitted by the engine while loading or executing.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// One raw diagnostic text line.
    Log(String),
    /// Fractional progress for the current invocation.
    ///
    /// Nominally in [0.0, 1.0] but the engine may report out-of-range or
    /// non-monotonic values near filter-graph boundaries; consumers must
    /// clamp.
    Progress(f32),
}

/// Subscriber callback for engine events.
///
/// Invoked on the engine's reader threads while an invocation is in flight,
/// so it must be `Send + Sync` and cheap.
pub type EngineEventCallback = Box<dyn Fn(&EngineEvent) + Send + Sync>;

/// Errors surfaced by an engine binding.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be initialized.
    #[error("engine load failed: {0}")]
    LoadFailed(String),

    /// The engine was used before a successful `load()`.
    #[error("engine not loaded")]
    NotLoaded,

    /// An invocation exited with a failure status.
    #[error("engine invocation failed with exit code {exit_code}: {message}")]
    ExecFailed { exit_code: i32, message: String },

    /// A named entry was not found in the virtual file space.
    #[error("no such entry in engine file space: {name}")]
    FileNotFound { name: String },

    /// I/O failure while staging or retrieving bytes.
    #[error("engine I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Create a load failure.
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed(message.into())
    }

    /// Create an invocation failure.
    pub fn exec_failed(exit_code: i32, message: impl Into<String>) -> Self {
        Self::ExecFailed {
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// The loaded, ready-to-invoke media engine.
///
/// Implementations are not re-entrant: at most one `exec` may be in flight
/// per handle. `load` must be idempotent after the first success.
pub trait Engine: Send {
    /// Initialize the engine, acquiring whatever runtime artifacts it needs.
    ///
    /// Idempotent: returns immediately once loaded.
    fn load(&mut self) -> EngineResult<()>;

    /// Whether `load` has completed successfully.
    fn is_loaded(&self) -> bool;

    /// Register an event subscriber for the lifetime of the handle.
    fn subscribe(&mut self, callback: EngineEventCallback);

    /// Stage bytes under a name in the virtual file space.
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult<()>;

    /// Run one invocation to completion.
    fn exec(&mut self, args: &[String]) -> EngineResult<()>;

    /// Read bytes back from the virtual file space.
    fn read_file(&mut self, name: &str) -> EngineResult<Vec<u8>>;
}
