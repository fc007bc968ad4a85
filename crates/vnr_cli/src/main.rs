//! vnr — reduce background noise in a video's audio track.
//!
//! Usage:
//!   vnr process clip.mov                 Filter a video, write processed-clip.mov
//!   vnr process clip.mov -o out.mp4      Filter to an explicit output path
//!   vnr provision                        Download the engine runtime up front

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use vnr_core::config::ConfigManager;
use vnr_core::logging::{init_tracing, LogLevel};
use vnr_core::models::SourceAsset;
use vnr_core::session::{ProcessingSession, SessionEvent};
use vnr_engine::{ensure_engine_runtime, BootstrapProgress, FfmpegEngine};

#[derive(Parser)]
#[command(
    name = "vnr",
    about = "Reduce background noise (voices, wind) in a video's audio track",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the engine runtime (default: from config, then the
    /// platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fixed noise-reduction filter over a video file
    Process {
        /// Input video file
        input: PathBuf,

        /// Output path (default: processed-<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download the engine runtime without processing anything
    Provision,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = directories::ProjectDirs::from("", "", "vnr")
        .ok_or_else(|| anyhow!("cannot determine platform directories"))?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| dirs.config_dir().join("vnr.toml"));
    let mut config = ConfigManager::new(&config_path);
    config
        .load_or_create()
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.settings().logging.level
    };
    init_tracing(level);

    let data_dir = match cli.data_dir {
        Some(ref dir) => dir.clone(),
        None => match config.settings().engine.data_dir.as_str() {
            "" => dirs.data_dir().to_path_buf(),
            configured => PathBuf::from(configured),
        },
    };

    let log_tail = config.settings().logging.engine_log_tail;

    match cli.command {
        Commands::Process { input, output } => process(input, output, data_dir, log_tail).await,
        Commands::Provision => provision(data_dir).await,
    }
}

async fn process(
    input: PathBuf,
    output: Option<PathBuf>,
    data_dir: PathBuf,
    log_tail: usize,
) -> Result<()> {
    let bytes =
        fs::read(&input).with_context(|| format!("reading input {}", input.display()))?;
    let name = input
        .file_name()
        .ok_or_else(|| anyhow!("input path has no file name"))?
        .to_string_lossy()
        .to_string();
    let source = SourceAsset::new(&name, media_type_for(&input), bytes);
    eprintln!("selected {} ({})", source.name, source.human_size());

    let engine = FfmpegEngine::new(data_dir);
    let mut session = ProcessingSession::new(Box::new(engine))
        .with_log_tail(log_tail)
        .with_observer(Arc::new(|event: &SessionEvent| match event {
            SessionEvent::Phase(phase) => eprintln!("state: {phase}"),
            SessionEvent::Progress(fraction) => {
                eprint!("\rprocessing: {:>3.0}%", fraction * 100.0);
                let _ = std::io::stderr().flush();
            }
            SessionEvent::EngineLog(_) => {}
        }));

    // The session core is synchronous; run it off the async executor.
    let session = tokio::task::spawn_blocking(move || {
        session.select_file(source);
        let outcome = session.start();
        (session, outcome)
    });
    let (session, outcome) = session.await.context("processing task panicked")?;
    eprintln!();

    if let Err(e) = outcome {
        tracing::error!(error = %e, "run failed");
        if let Some(line) = session.last_engine_log() {
            eprintln!("engine: {line}");
        }
        bail!("{}", e.user_message());
    }

    let asset = session
        .result()
        .ok_or_else(|| anyhow!("session finished without a result"))?;
    let output = output.unwrap_or_else(|| default_output(&input, &asset.name));
    fs::write(&output, asset.bytes.as_slice())
        .with_context(|| format!("writing output {}", output.display()))?;
    eprintln!("wrote {} ({})", output.display(), asset.size());

    Ok(())
}

async fn provision(data_dir: PathBuf) -> Result<()> {
    let paths = ensure_engine_runtime(&data_dir, |report| match report {
        BootstrapProgress::Downloading { tool, percent } => {
            eprint!("\rdownloading {tool}: {percent:>3}%");
            let _ = std::io::stderr().flush();
        }
        BootstrapProgress::Ready => eprintln!("\rengine runtime ready          "),
    })
    .await
    .context("provisioning engine runtime")?;
    eprintln!("runtime at {}", paths.root.display());
    Ok(())
}

/// Declared media type from the file extension.
fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        _ => "video/mp4",
    }
}

/// Default output path: the derived asset name next to the input.
fn default_output(input: &Path, asset_name: &str) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(asset_name),
        _ => PathBuf::from(asset_name),
    }
}
