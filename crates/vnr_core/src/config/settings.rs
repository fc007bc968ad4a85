//! Settings struct with TOML-based sections.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Engine runtime settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Engine runtime configuration.
///
/// The engine distribution itself is pinned in code; only where it lives on
/// disk is configurable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Directory holding the provisioned engine runtime.
    ///
    /// Empty means "use the platform data directory".
    #[serde(default)]
    pub data_dir: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for application logs (overridden by RUST_LOG).
    #[serde(default)]
    pub level: LogLevel,

    /// Number of raw engine log lines retained for error diagnosis.
    #[serde(default = "default_engine_log_tail")]
    pub engine_log_tail: usize,
}

fn default_engine_log_tail() -> usize {
    crate::logging::DEFAULT_TAIL_LEN
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            engine_log_tail: default_engine_log_tail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let settings = Settings::default();
        let text = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.logging.engine_log_tail, settings.logging.engine_log_tail);
        assert_eq!(parsed.logging.level, settings.logging.level);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let parsed: Settings = toml::from_str("").unwrap();
        assert!(parsed.engine.data_dir.is_empty());
        assert_eq!(parsed.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_section_fills_remaining_keys() {
        let parsed: Settings = toml::from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(parsed.logging.level, LogLevel::Debug);
        assert_eq!(
            parsed.logging.engine_log_tail,
            default_engine_log_tail()
        );
    }
}
