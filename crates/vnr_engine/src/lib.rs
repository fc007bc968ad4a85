//! Concrete engine binding for Video Noise Reducer.
//!
//! Implements `vnr_core::engine::Engine` on top of a provisioned ffmpeg
//! runtime:
//!
//! - `bootstrap` downloads the two pinned binary artifacts (ffmpeg and
//!   ffprobe) from a fixed static-build release
//! - `FfmpegEngine` stages bytes into a scratch "virtual file space",
//!   invokes ffmpeg with progress reporting on `pipe:1`, forwards raw
//!   stderr lines as log events, and reads results back
//!
//! The session core never sees any of this; it only talks to the trait.

pub mod bootstrap;
mod ffmpeg;
mod probe;
mod progress;

pub use bootstrap::{ensure_engine_runtime, BootstrapProgress, EngineBootstrapError, EnginePaths};
pub use ffmpeg::FfmpegEngine;
