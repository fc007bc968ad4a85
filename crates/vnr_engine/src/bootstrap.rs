//! Engine runtime bootstrapper.
//!
//! Downloads the two pinned binary artifacts the engine needs (the ffmpeg
//! executable and the ffprobe executable) from a fixed release of a
//! static-build distribution. This keeps the engine version deterministic
//! instead of depending on whatever the host system has installed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Pinned release tag of the static-build distribution.
const ENGINE_RELEASE: &str = "b6.0";

/// Pinned distribution location.
const ENGINE_BASE_URL: &str = "https://github.com/eugeneware/ffmpeg-static/releases/download";

#[derive(Error, Debug)]
pub enum EngineBootstrapError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to download engine artifact: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Paths to the provisioned engine runtime.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    /// Root directory for all runtime files.
    pub root: PathBuf,
    /// Path to the ffmpeg executable.
    pub ffmpeg_exe: PathBuf,
    /// Path to the ffprobe executable.
    pub ffprobe_exe: PathBuf,
}

impl EnginePaths {
    pub fn new(data_dir: &Path) -> Self {
        let root = data_dir.join("runtime");

        #[cfg(windows)]
        let (ffmpeg_exe, ffprobe_exe) = (root.join("ffmpeg.exe"), root.join("ffprobe.exe"));
        #[cfg(not(windows))]
        let (ffmpeg_exe, ffprobe_exe) = (root.join("ffmpeg"), root.join("ffprobe"));

        Self {
            root,
            ffmpeg_exe,
            ffprobe_exe,
        }
    }

    /// Check if both artifacts are provisioned.
    pub fn is_ready(&self) -> bool {
        self.ffmpeg_exe.exists() && self.ffprobe_exe.exists()
    }
}

/// Progress updates during bootstrap.
#[derive(Debug, Clone)]
pub enum BootstrapProgress {
    Downloading { tool: &'static str, percent: u8 },
    Ready,
}

/// Ensure the engine runtime is available, downloading it if needed.
///
/// Idempotent: if both artifacts already exist this returns immediately
/// without network work.
pub async fn ensure_engine_runtime(
    data_dir: &Path,
    progress_callback: impl Fn(BootstrapProgress),
) -> Result<EnginePaths, EngineBootstrapError> {
    let paths = EnginePaths::new(data_dir);

    if paths.is_ready() {
        info!("engine runtime already available at {:?}", paths.root);
        progress_callback(BootstrapProgress::Ready);
        return Ok(paths);
    }

    info!(release = ENGINE_RELEASE, "provisioning engine runtime");

    fs::create_dir_all(&paths.root).map_err(|e| EngineBootstrapError::CreateDir {
        path: paths.root.clone(),
        source: e,
    })?;

    let suffix = platform_suffix()?;
    let client = reqwest::Client::new();

    for (tool, dest) in [
        ("ffmpeg", &paths.ffmpeg_exe),
        ("ffprobe", &paths.ffprobe_exe),
    ] {
        if dest.exists() {
            continue;
        }
        let url = artifact_url(tool, suffix);
        download_artifact(&client, &url, dest, |percent| {
            progress_callback(BootstrapProgress::Downloading { tool, percent });
        })
        .await?;
    }

    progress_callback(BootstrapProgress::Ready);
    info!("engine runtime ready at {:?}", paths.root);

    Ok(paths)
}

/// URL of one artifact at the pinned release.
fn artifact_url(tool: &str, suffix: &str) -> String {
    format!("{ENGINE_BASE_URL}/{ENGINE_RELEASE}/{tool}-{suffix}")
}

/// Artifact name suffix for the current platform.
fn platform_suffix() -> Result<&'static str, EngineBootstrapError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    match (os, arch) {
        ("linux", "x86_64") => Ok("linux-x64"),
        ("linux", "aarch64") => Ok("linux-arm64"),
        ("macos", "x86_64") => Ok("darwin-x64"),
        ("macos", "aarch64") => Ok("darwin-arm64"),
        ("windows", "x86_64") => Ok("win32-x64"),
        _ => Err(EngineBootstrapError::UnsupportedPlatform(format!(
            "{os}/{arch}"
        ))),
    }
}

async fn download_artifact(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: impl Fn(u8),
) -> Result<(), EngineBootstrapError> {
    info!("downloading {}", url);

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(EngineBootstrapError::Download(format!(
            "HTTP {}: {}",
            response.status(),
            url
        )));
    }

    let total_size = response.content_length().unwrap_or(0);

    // Download next to the destination, rename when complete so a killed
    // process never leaves a half-written executable behind.
    let partial = dest.with_extension("partial");
    let mut file = fs::File::create(&partial)?;
    let mut downloaded: u64 = 0;

    let mut stream = response.bytes_stream();
    use futures_util::StreamExt;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;

        if total_size > 0 {
            let percent = ((downloaded as f64 / total_size as f64) * 100.0) as u8;
            progress(percent);
        }
    }
    file.flush()?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&partial, fs::Permissions::from_mode(0o755))?;
    }

    fs::rename(&partial, dest)?;
    debug!("downloaded {} bytes to {}", downloaded, dest.display());

    Ok(())
}
