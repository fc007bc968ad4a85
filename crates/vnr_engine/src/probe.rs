//! Media duration probing using ffprobe.
//!
//! The progress fraction reported during an invocation is the output
//! timestamp over the input duration, so the input has to be probed once
//! before execution.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffprobe failed with exit code {exit_code}: {message}")]
    Failed { exit_code: i32, message: String },

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(String),
}

/// Probe the duration of a media file, in seconds.
pub fn media_duration_secs(ffprobe_exe: &Path, media: &Path) -> Result<f64, ProbeError> {
    tracing::debug!("probing {}", media.display());

    let output = Command::new(ffprobe_exe)
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .arg(media)
        .output()?;

    if !output.status.success() {
        return Err(ProbeError::Failed {
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_duration_json(&output.stdout)
}

/// Parse `{"format": {"duration": "4.02"}}`.
fn parse_duration_json(stdout: &[u8]) -> Result<f64, ProbeError> {
    let json: Value =
        serde_json::from_slice(stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;

    json.get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| ProbeError::Parse("no usable duration in format section".to_string()))
}
