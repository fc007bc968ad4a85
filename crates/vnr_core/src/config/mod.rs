//! Configuration management.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Defaults when the file is missing or a key is absent
//!
//! # Example
//!
//! ```no_run
//! use vnr_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/vnr.toml");
//! config.load_or_create().unwrap();
//! println!("tail length: {}", config.settings().logging.engine_log_tail);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{EngineSettings, LoggingSettings, Settings};
