//! ffmpeg-backed implementation of the engine trait.
//!
//! The virtual file space is a scratch temp directory owned by the handle:
//! `write_file` stages bytes under flat names, `exec` runs ffmpeg with the
//! scratch directory as its working directory so the fixed entry names
//! resolve without path rewriting, and `read_file` retrieves results. The
//! scratch directory is removed when the handle is dropped.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use vnr_core::engine::{Engine, EngineError, EngineEvent, EngineEventCallback, EngineResult};
use vnr_core::logging::LogTail;

use crate::bootstrap::{self, BootstrapProgress, EnginePaths};
use crate::probe;
use crate::progress::ProgressState;

/// Number of stderr lines kept for the failure message.
const STDERR_TAIL: usize = 40;

/// Plumbing arguments prepended to every invocation.
///
/// The caller's argument list stays exactly the fixed filter command; these
/// only route machine-readable progress to stdout and keep stderr readable.
const EXEC_PREFIX: [&str; 7] = [
    "-y",
    "-hide_banner",
    "-nostats",
    "-loglevel",
    "info",
    "-progress",
    "pipe:1",
];

struct Subscribers(Mutex<Vec<EngineEventCallback>>);

impl Subscribers {
    fn emit(&self, event: &EngineEvent) {
        for callback in self.0.lock().iter() {
            callback(event);
        }
    }
}

/// Engine handle backed by a provisioned ffmpeg runtime.
///
/// Not re-entrant: one invocation at a time.
pub struct FfmpegEngine {
    data_dir: PathBuf,
    paths: EnginePaths,
    scratch: Option<TempDir>,
    loaded: bool,
    subscribers: Arc<Subscribers>,
}

impl FfmpegEngine {
    /// Create an unloaded handle rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let paths = EnginePaths::new(&data_dir);
        Self {
            data_dir,
            paths,
            scratch: None,
            loaded: false,
            subscribers: Arc::new(Subscribers(Mutex::new(Vec::new()))),
        }
    }

    /// Resolve an entry name inside the virtual file space.
    ///
    /// Names are flat: anything that could escape the scratch directory is
    /// rejected.
    fn entry_path(&self, name: &str) -> EngineResult<PathBuf> {
        let scratch = self.scratch.as_ref().ok_or(EngineError::NotLoaded)?;
        if name.is_empty() || name == ".." || name.contains(['/', '\\']) {
            return Err(EngineError::io(
                format!("resolve entry '{name}'"),
                io::Error::new(io::ErrorKind::InvalidInput, "entry names must be flat"),
            ));
        }
        Ok(scratch.path().join(name))
    }

    /// Provision the runtime artifacts if they are missing.
    fn provision_runtime(&self) -> EngineResult<()> {
        if self.paths.is_ready() {
            return Ok(());
        }
        let subscribers = Arc::clone(&self.subscribers);
        let last_decile = AtomicU8::new(u8::MAX);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EngineError::load_failed(format!("bootstrap runtime: {e}")))?;

        runtime
            .block_on(bootstrap::ensure_engine_runtime(&self.data_dir, |report| {
                if let BootstrapProgress::Downloading { tool, percent } = report {
                    let decile = percent / 10;
                    if last_decile.swap(decile, Ordering::Relaxed) != decile {
                        subscribers
                            .emit(&EngineEvent::Log(format!("downloading {tool}: {percent}%")));
                    }
                }
            }))
            .map_err(|e| EngineError::load_failed(e.to_string()))?;
        Ok(())
    }
}

impl Engine for FfmpegEngine {
    fn load(&mut self) -> EngineResult<()> {
        if self.loaded {
            return Ok(());
        }

        self.provision_runtime()?;

        // Version handshake: a runtime that cannot even print its banner
        // must not be invoked.
        let output = Command::new(&self.paths.ffmpeg_exe)
            .arg("-version")
            .output()
            .map_err(|e| EngineError::load_failed(format!("cannot run engine executable: {e}")))?;
        if !output.status.success() {
            return Err(EngineError::load_failed(format!(
                "engine handshake exited with {}",
                output.status.code().unwrap_or(-1)
            )));
        }
        let banner = String::from_utf8_lossy(&output.stdout);
        let banner = banner.lines().next().unwrap_or("").to_string();
        tracing::info!(%banner, "engine loaded");
        self.subscribers.emit(&EngineEvent::Log(banner));

        self.scratch = Some(
            TempDir::with_prefix("vnr-filespace-")
                .map_err(|e| EngineError::io("create scratch file space", e))?,
        );
        self.loaded = true;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn subscribe(&mut self, callback: EngineEventCallback) {
        self.subscribers.0.lock().push(callback);
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult<()> {
        let path = self.entry_path(name)?;
        fs::write(&path, bytes).map_err(|e| EngineError::io(format!("stage '{name}'"), e))
    }

    fn exec(&mut self, args: &[String]) -> EngineResult<()> {
        let scratch = self.scratch.as_ref().ok_or(EngineError::NotLoaded)?;

        // Probe the staged input so progress can be reported as a fraction
        // of the whole file.
        let duration = input_entry(args).and_then(|name| {
            let staged = scratch.path().join(name);
            match probe::media_duration_secs(&self.paths.ffprobe_exe, &staged) {
                Ok(secs) => Some(secs),
                Err(e) => {
                    tracing::warn!(error = %e, "input probe failed; progress will be coarse");
                    None
                }
            }
        });

        tracing::debug!(?args, "engine invocation starting");

        let mut child = Command::new(&self.paths.ffmpeg_exe)
            .current_dir(scratch.path())
            .args(EXEC_PREFIX)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::io("spawn engine", e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            EngineError::io(
                "capture engine stdout",
                io::Error::new(io::ErrorKind::Other, "no stdout pipe"),
            )
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            EngineError::io(
                "capture engine stderr",
                io::Error::new(io::ErrorKind::Other, "no stderr pipe"),
            )
        })?;

        // Drain stderr on its own thread so the engine never blocks on a
        // full pipe; every line is forwarded as a log event and the tail is
        // kept for the failure message.
        let subscribers = Arc::clone(&self.subscribers);
        let stderr_task = std::thread::spawn(move || -> String {
            let reader = BufReader::new(stderr);
            let mut tail = LogTail::new(STDERR_TAIL);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                subscribers.emit(&EngineEvent::Log(line.clone()));
                tail.push(line);
            }
            tail.joined()
        });

        // The progress stream is parsed on the calling thread. On a read
        // failure the child may still be running; reap it before surfacing
        // the error so no zombie is left behind.
        let pump = pump_progress(stdout, duration, &self.subscribers);
        if pump.is_err() {
            let _ = child.kill();
        }

        let status = child
            .wait()
            .map_err(|e| EngineError::io("wait for engine", e))?;
        let tail = stderr_task
            .join()
            .unwrap_or_else(|_| "<engine stderr reader panicked>".to_string());

        pump.map_err(|e| EngineError::io("read engine progress", e))?;

        if !status.success() {
            return Err(EngineError::exec_failed(
                status.code().unwrap_or(-1),
                tail,
            ));
        }

        tracing::debug!("engine invocation finished");
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> EngineResult<Vec<u8>> {
        let path = self.entry_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(EngineError::FileNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(EngineError::io(format!("retrieve '{name}'"), e)),
        }
    }
}

/// The entry name following `-i`, if any.
fn input_entry(args: &[String]) -> Option<&str> {
    args.windows(2)
        .find(|pair| pair[0] == "-i")
        .map(|pair| pair[1].as_str())
}

/// Parse the progress stream, emitting one fraction per completed block.
fn pump_progress(
    stdout: impl io::Read,
    duration: Option<f64>,
    subscribers: &Subscribers,
) -> io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    let mut state = ProgressState::default();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        if let Some((key, value)) = line.trim().split_once('=') {
            if state.update(key, value) {
                if let Some(fraction) = state.fraction(duration) {
                    subscribers.emit(&EngineEvent::Progress(fraction as f32));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_scratch() -> FfmpegEngine {
        let mut engine = FfmpegEngine::new(std::env::temp_dir().join("vnr-test-data"));
        engine.scratch = Some(TempDir::with_prefix("vnr-test-").unwrap());
        engine
    }

    #[test]
    fn file_space_round_trip() {
        let mut engine = engine_with_scratch();
        engine.write_file("input.mp4", b"abc").unwrap();
        assert_eq!(engine.read_file("input.mp4").unwrap(), b"abc");
    }

    #[test]
    fn missing_entry_is_file_not_found() {
        let mut engine = engine_with_scratch();
        let err = engine.read_file("output.mp4").unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound { name } if name == "output.mp4"));
    }

    #[test]
    fn nested_names_are_rejected() {
        let mut engine = engine_with_scratch();
        assert!(engine.write_file("../escape", b"x").is_err());
        assert!(engine.write_file("a/b.mp4", b"x").is_err());
        assert!(engine.write_file("", b"x").is_err());
    }

    #[test]
    fn file_space_requires_load() {
        let mut engine = FfmpegEngine::new("/tmp/vnr-never-loaded");
        assert!(matches!(
            engine.write_file("input.mp4", b"x"),
            Err(EngineError::NotLoaded)
        ));
        assert!(matches!(
            engine.exec(&["-i".to_string(), "input.mp4".to_string()]),
            Err(EngineError::NotLoaded)
        ));
        assert!(!engine.is_loaded());
    }

    #[test]
    fn progress_pump_emits_one_fraction_per_block() {
        let subscribers = Subscribers(Mutex::new(Vec::new()));
        let seen: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        subscribers.0.lock().push(Box::new(move |event| {
            if let EngineEvent::Progress(fraction) = event {
                sink.lock().push(*fraction);
            }
        }));

        let feed: &[u8] =
            b"out_time_us=2000000\nprogress=continue\nout_time_us=4000000\nprogress=end\n";
        pump_progress(feed, Some(8.0), &subscribers).unwrap();
        assert_eq!(*seen.lock(), vec![0.25, 1.0]);
    }

    #[test]
    fn progress_pump_surfaces_read_errors() {
        let subscribers = Subscribers(Mutex::new(Vec::new()));
        // Non-UTF-8 bytes make the line read fail.
        let feed: &[u8] = &[0xff, 0xfe, b'\n'];
        let err = pump_progress(feed, Some(1.0), &subscribers).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn input_entry_follows_dash_i() {
        let args: Vec<String> = ["-i", "input.mp4", "-c:v", "copy", "output.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(input_entry(&args), Some("input.mp4"));
        assert_eq!(input_entry(&args[2..]), None);
    }
}
