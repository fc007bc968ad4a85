//! The processing session state machine.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::{Engine, EngineEvent, EngineResult};
use crate::logging::LogTail;
use crate::models::{ProcessedAsset, SessionPhase, SourceAsset};

use super::errors::{SessionError, SessionResult};
use super::filter;
use super::state::SessionState;

/// Typed event emitted by the session for presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The lifecycle phase changed.
    Phase(SessionPhase),
    /// Clamped progress for the current run.
    Progress(f32),
    /// One raw diagnostic line from the engine.
    EngineLog(String),
}

/// Subscriber callback for session events.
///
/// Progress and log events are delivered on the engine's reader threads
/// while an invocation is in flight; phase events on the caller's thread.
pub type SessionEventCallback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// State shared with the engine event subscription.
struct Shared {
    state: Mutex<SessionState>,
    engine_log: Mutex<LogTail>,
    observer: Mutex<Option<SessionEventCallback>>,
}

impl Shared {
    fn emit(&self, event: &SessionEvent) {
        if let Some(observer) = self.observer.lock().clone() {
            observer(event);
        }
    }
}

/// One processing session: owns the engine handle, the selected source,
/// and the observable state.
///
/// At most one run is in flight at a time; `start` is a blocking call that
/// returns when the run has reached `Done` or `Error`. Embeddings are
/// expected to drive it from a worker thread and to disable the start
/// action while [`SessionPhase::is_busy`] holds.
pub struct ProcessingSession {
    engine: Box<dyn Engine>,
    /// Set after the first successful bootstrap; never re-initialized.
    engine_ready: bool,
    /// The event subscription is registered once per handle lifetime.
    subscribed: bool,
    source: Option<SourceAsset>,
    shared: Arc<Shared>,
}

impl ProcessingSession {
    /// Create a session around an engine handle.
    ///
    /// The handle is an injected dependency rather than a process-wide
    /// global so tests can substitute a fake.
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            engine_ready: false,
            subscribed: false,
            source: None,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::default()),
                engine_log: Mutex::new(LogTail::default()),
                observer: Mutex::new(None),
            }),
        }
    }

    /// Register an observer for session events (builder pattern).
    pub fn with_observer(self, observer: SessionEventCallback) -> Self {
        *self.shared.observer.lock() = Some(observer);
        self
    }

    /// Set how many raw engine log lines are retained (builder pattern).
    pub fn with_log_tail(self, capacity: usize) -> Self {
        *self.shared.engine_log.lock() = LogTail::new(capacity);
        self
    }

    /// Select a new source asset.
    ///
    /// Allowed from any phase; discards the previous run's result and error
    /// and resets progress to zero. The previous processed asset's backing
    /// buffer is released here unless the caller still holds a reference.
    pub fn select_file(&mut self, source: SourceAsset) {
        tracing::info!(name = %source.name, size = source.size(), "source selected");
        self.source = Some(source);
        self.shared.state.lock().reset_for_selection();
        self.shared.emit(&SessionEvent::Phase(SessionPhase::Idle));
    }

    /// Drop the selected source and return to a pristine `Idle`.
    pub fn clear_file(&mut self) {
        self.source = None;
        self.shared.state.lock().reset_for_selection();
        self.shared.emit(&SessionEvent::Phase(SessionPhase::Idle));
    }

    /// Run the fixed noise-reduction pipeline against the selected source.
    ///
    /// Only honored from `Idle` or `Error`; anywhere else it is a logged
    /// no-op, enforcing at-most-one-active-run as a caller-side discipline.
    /// On failure the error is both recorded in the session state and
    /// returned. Retrying re-enters here; a ready engine handle is reused
    /// without re-initialization.
    pub fn start(&mut self) -> SessionResult<()> {
        let phase = self.phase();
        if !phase.can_start() {
            tracing::warn!(%phase, "start requested while busy or done; ignoring");
            return Ok(());
        }
        let source = match self.source.clone() {
            Some(source) => source,
            None => {
                tracing::warn!("start requested with no source selected; ignoring");
                return Ok(());
            }
        };

        {
            let mut state = self.shared.state.lock();
            state.error = None;
            state.result = None;
            state.progress = 0.0;
            state.phase = SessionPhase::LoadingEngine;
        }
        self.shared
            .emit(&SessionEvent::Phase(SessionPhase::LoadingEngine));

        if let Err(e) = self.ensure_engine_ready() {
            tracing::error!(error = %e, "engine bootstrap failed");
            return Err(self.fail(SessionError::engine_load(e.to_string())));
        }

        self.set_phase(SessionPhase::Processing);
        tracing::info!(source = %source.name, "processing started");

        match self.run_invocation(&source) {
            Ok(asset) => {
                tracing::info!(
                    output = %asset.name,
                    size = asset.size(),
                    "processing finished"
                );
                let mut state = self.shared.state.lock();
                state.result = Some(asset);
                state.phase = SessionPhase::Done;
                drop(state);
                self.shared.emit(&SessionEvent::Phase(SessionPhase::Done));
                Ok(())
            }
            Err(e) => {
                let tail = self.shared.engine_log.lock().joined();
                if !tail.is_empty() {
                    tracing::error!(error = %e, engine_tail = %tail, "invocation failed");
                } else {
                    tracing::error!(error = %e, "invocation failed");
                }
                Err(self.fail(SessionError::processing(e.to_string())))
            }
        }
    }

    /// Return to `Idle` after `Done` or `Error`, keeping the source so the
    /// same file can be run again.
    pub fn reset(&mut self) {
        let mut state = self.shared.state.lock();
        if state.phase.is_busy() {
            tracing::warn!(phase = %state.phase, "reset requested while busy; ignoring");
            return;
        }
        state.phase = SessionPhase::Idle;
        state.progress = 0.0;
        state.result = None;
        state.error = None;
        drop(state);
        self.shared.emit(&SessionEvent::Phase(SessionPhase::Idle));
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.shared.state.lock().phase
    }

    /// Clamped progress of the current run.
    pub fn progress(&self) -> f32 {
        self.shared.state.lock().progress
    }

    /// Result of the last successful run.
    pub fn result(&self) -> Option<ProcessedAsset> {
        self.shared.state.lock().result.clone()
    }

    /// Detail of the last failed run.
    pub fn error(&self) -> Option<SessionError> {
        self.shared.state.lock().error.clone()
    }

    /// User-readable message for the last failure.
    pub fn error_message(&self) -> Option<&'static str> {
        self.shared.state.lock().error_message()
    }

    /// The currently selected source, if any.
    pub fn source(&self) -> Option<&SourceAsset> {
        self.source.as_ref()
    }

    /// Snapshot of the observable state.
    pub fn state(&self) -> SessionState {
        self.shared.state.lock().clone()
    }

    /// The most recent raw engine log line.
    pub fn last_engine_log(&self) -> Option<String> {
        self.shared.engine_log.lock().last().map(str::to_string)
    }

    /// Retained raw engine log lines, oldest first.
    pub fn engine_log_lines(&self) -> Vec<String> {
        self.shared
            .engine_log
            .lock()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Whether the engine handle has completed bootstrap.
    pub fn is_engine_ready(&self) -> bool {
        self.engine_ready
    }

    /// Obtain a ready engine handle exactly once per session lifetime.
    ///
    /// Idempotent: after the first success this returns immediately with no
    /// engine work. The event subscription is registered before the first
    /// `load` so bootstrap diagnostics are captured too.
    fn ensure_engine_ready(&mut self) -> EngineResult<()> {
        if self.engine_ready {
            return Ok(());
        }

        if !self.subscribed {
            let shared = Arc::clone(&self.shared);
            self.engine.subscribe(Box::new(move |event| match event {
                EngineEvent::Progress(fraction) => {
                    let clamped = {
                        let mut state = shared.state.lock();
                        state.apply_progress(*fraction);
                        state.progress
                    };
                    shared.emit(&SessionEvent::Progress(clamped));
                }
                EngineEvent::Log(line) => {
                    tracing::debug!(target: "vnr::engine", "{}", line);
                    shared.engine_log.lock().push(line.clone());
                    shared.emit(&SessionEvent::EngineLog(line.clone()));
                }
            }));
            self.subscribed = true;
        }

        self.engine.load()?;
        self.engine_ready = true;
        tracing::info!("engine ready");
        Ok(())
    }

    /// Stage input, invoke the fixed filter, and retrieve the output.
    fn run_invocation(&mut self, source: &SourceAsset) -> EngineResult<ProcessedAsset> {
        self.engine.write_file(filter::INPUT_NAME, &source.bytes)?;
        self.engine.exec(&filter::noise_reduction_args())?;
        let bytes = self.engine.read_file(filter::OUTPUT_NAME)?;
        Ok(ProcessedAsset::from_engine_output(&source.name, bytes))
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.shared.state.lock().phase = phase;
        self.shared.emit(&SessionEvent::Phase(phase));
    }

    /// Record a failure and transition to `Error`.
    ///
    /// Progress keeps its last reported value so the UI does not jump back
    /// to zero on failure.
    fn fail(&self, error: SessionError) -> SessionError {
        {
            let mut state = self.shared.state.lock();
            state.error = Some(error.clone());
            state.phase = SessionPhase::Error;
        }
        self.shared.emit(&SessionEvent::Phase(SessionPhase::Error));
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, EngineEventCallback};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scriptable in-memory engine.
    struct FakeEngine {
        loaded: bool,
        load_calls: Arc<AtomicUsize>,
        fail_loads: usize,
        fail_exec: bool,
        progress_script: Vec<f32>,
        log_script: Vec<String>,
        files: HashMap<String, Vec<u8>>,
        output: Vec<u8>,
        callbacks: Vec<EngineEventCallback>,
        exec_args: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                loaded: false,
                load_calls: Arc::new(AtomicUsize::new(0)),
                fail_loads: 0,
                fail_exec: false,
                progress_script: vec![0.5, 1.0],
                log_script: vec!["frame=  100 time=00:00:04.00".to_string()],
                files: HashMap::new(),
                output: b"denoised".to_vec(),
                callbacks: Vec::new(),
                exec_args: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn emit(&self, event: EngineEvent) {
            for cb in &self.callbacks {
                cb(&event);
            }
        }
    }

    impl Engine for FakeEngine {
        fn load(&mut self) -> EngineResult<()> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_loads > 0 {
                self.fail_loads -= 1;
                return Err(EngineError::load_failed("simulated network error"));
            }
            self.loaded = true;
            Ok(())
        }

        fn is_loaded(&self) -> bool {
            self.loaded
        }

        fn subscribe(&mut self, callback: EngineEventCallback) {
            self.callbacks.push(callback);
        }

        fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult<()> {
            self.files.insert(name.to_string(), bytes.to_vec());
            Ok(())
        }

        fn exec(&mut self, args: &[String]) -> EngineResult<()> {
            self.exec_args.lock().push(args.to_vec());
            for line in self.log_script.clone() {
                self.emit(EngineEvent::Log(line));
            }
            for p in self.progress_script.clone() {
                self.emit(EngineEvent::Progress(p));
            }
            if self.fail_exec {
                return Err(EngineError::exec_failed(183, "Filter not found"));
            }
            self.files
                .insert(filter::OUTPUT_NAME.to_string(), self.output.clone());
            Ok(())
        }

        fn read_file(&mut self, name: &str) -> EngineResult<Vec<u8>> {
            self.files
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::FileNotFound {
                    name: name.to_string(),
                })
        }
    }

    fn source(name: &str) -> SourceAsset {
        SourceAsset::new(name, "video/quicktime", vec![0u8; 16])
    }

    #[test]
    fn happy_path_reaches_done_with_derived_name() {
        let mut session = ProcessingSession::new(Box::new(FakeEngine::new()));
        session.select_file(source("clip.mov"));
        session.start().unwrap();

        assert_eq!(session.phase(), SessionPhase::Done);
        let asset = session.result().unwrap();
        assert_eq!(asset.name, "processed-clip.mov");
        assert_eq!(asset.media_type, "video/mp4");
        assert_eq!(asset.bytes.as_slice(), b"denoised");
        assert_eq!(session.progress(), 1.0);
    }

    #[test]
    fn invocation_uses_the_fixed_argument_list() {
        let engine = FakeEngine::new();
        let recorded = Arc::clone(&engine.exec_args);
        let mut session = ProcessingSession::new(Box::new(engine));
        session.select_file(source("clip.mp4"));
        session.start().unwrap();

        let calls = recorded.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], filter::noise_reduction_args());
    }

    #[test]
    fn bootstrap_is_idempotent_across_runs() {
        let engine = FakeEngine::new();
        let load_calls = Arc::clone(&engine.load_calls);
        let mut session = ProcessingSession::new(Box::new(engine));
        session.select_file(source("clip.mp4"));

        for _ in 0..3 {
            session.start().unwrap();
            session.reset();
        }

        assert_eq!(load_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn load_failure_sets_engine_load_error_and_retry_succeeds() {
        let mut engine = FakeEngine::new();
        engine.fail_loads = 1;
        let load_calls = Arc::clone(&engine.load_calls);
        let mut session = ProcessingSession::new(Box::new(engine));
        session.select_file(source("clip.mp4"));

        let err = session.start().unwrap_err();
        assert_eq!(err.kind(), crate::models::ErrorKind::EngineLoad);
        assert_eq!(session.phase(), SessionPhase::Error);
        assert!(session.error_message().unwrap().contains("may not support"));

        // Retry without re-selecting the file.
        session.start().unwrap();
        assert_eq!(session.phase(), SessionPhase::Done);
        assert_eq!(load_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn exec_failure_keeps_progress_and_source_for_retry() {
        let mut engine = FakeEngine::new();
        engine.fail_exec = true;
        engine.progress_script = vec![0.42];
        let mut session = ProcessingSession::new(Box::new(engine));
        session.select_file(source("clip.mov"));

        let err = session.start().unwrap_err();
        assert_eq!(err.kind(), crate::models::ErrorKind::Processing);
        assert_eq!(session.phase(), SessionPhase::Error);
        assert_eq!(session.progress(), 0.42);
        assert!(session.source().is_some());
        assert!(session.result().is_none());
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let mut engine = FakeEngine::new();
        engine.progress_script = vec![-0.3, 1.7];
        let mut session = ProcessingSession::new(Box::new(engine));
        session.select_file(source("clip.mp4"));
        session.start().unwrap();
        assert_eq!(session.progress(), 1.0);

        let mut engine = FakeEngine::new();
        engine.fail_exec = true;
        engine.progress_script = vec![1.7, -0.3];
        let mut session = ProcessingSession::new(Box::new(engine));
        session.select_file(source("clip.mp4"));
        let _ = session.start();
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn start_is_a_no_op_outside_idle_and_error() {
        let engine = FakeEngine::new();
        let recorded = Arc::clone(&engine.exec_args);
        let mut session = ProcessingSession::new(Box::new(engine));
        session.select_file(source("clip.mp4"));
        session.start().unwrap();
        assert_eq!(session.phase(), SessionPhase::Done);

        // Done is not a startable phase.
        session.start().unwrap();
        assert_eq!(recorded.lock().len(), 1);
        assert_eq!(session.phase(), SessionPhase::Done);
    }

    #[test]
    fn start_without_source_is_a_no_op() {
        let engine = FakeEngine::new();
        let load_calls = Arc::clone(&engine.load_calls);
        let mut session = ProcessingSession::new(Box::new(engine));
        session.start().unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(load_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn new_selection_discards_result_and_resets_progress() {
        let mut session = ProcessingSession::new(Box::new(FakeEngine::new()));
        session.select_file(source("first.mp4"));
        session.start().unwrap();
        assert!(session.result().is_some());

        session.select_file(source("second.mp4"));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.progress(), 0.0);
        assert!(session.result().is_none());
        assert!(session.error().is_none());
    }

    #[test]
    fn reset_returns_to_idle_keeping_source() {
        let mut session = ProcessingSession::new(Box::new(FakeEngine::new()));
        session.select_file(source("clip.mp4"));
        session.start().unwrap();
        session.reset();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.result().is_none());
        assert_eq!(session.source().unwrap().name, "clip.mp4");
    }

    #[test]
    fn observer_sees_loading_engine_before_processing() {
        let phases: Arc<Mutex<Vec<SessionPhase>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&phases);
        let mut session = ProcessingSession::new(Box::new(FakeEngine::new())).with_observer(
            Arc::new(move |event| {
                if let SessionEvent::Phase(phase) = event {
                    seen.lock().push(*phase);
                }
            }),
        );
        session.select_file(source("clip.mp4"));
        session.start().unwrap();

        let phases = phases.lock();
        assert_eq!(
            phases.as_slice(),
            &[
                SessionPhase::Idle,
                SessionPhase::LoadingEngine,
                SessionPhase::Processing,
                SessionPhase::Done,
            ]
        );
    }

    #[test]
    fn log_tail_capacity_limits_retained_lines() {
        let mut engine = FakeEngine::new();
        engine.log_script = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let mut session = ProcessingSession::new(Box::new(engine)).with_log_tail(1);
        session.select_file(source("clip.mp4"));
        session.start().unwrap();

        assert_eq!(session.engine_log_lines(), vec!["three"]);
        assert_eq!(session.last_engine_log().as_deref(), Some("three"));
    }

    #[test]
    fn engine_log_tail_retains_last_line() {
        let mut session = ProcessingSession::new(Box::new(FakeEngine::new()));
        session.select_file(source("clip.mp4"));
        session.start().unwrap();
        assert_eq!(
            session.last_engine_log().as_deref(),
            Some("frame=  100 time=00:00:04.00")
        );
    }
}
