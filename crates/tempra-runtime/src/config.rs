//! Configuration for Tempra
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! `TEMPRA_`-prefixed environment variables (`TEMPRA_SPECTATOR__POLL_INTERVAL_MS`).
//! Command-line flags are applied on top by the binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempra_core::{TempraError, TempraResult, Token};
use tempra_force::DigitSumSearch;
use tempra_queue::{Preset, PresetBook, DEFAULT_PROCESSED_CAPACITY};
use tracing::warn;

/// Recommended poll interval band
pub const POLL_INTERVAL_BAND_MS: (u64, u64) = (300, 500);

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempraConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub spectator: SpectatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Presets available to `PUSH` with `mode: preset`
    #[serde(default)]
    pub presets: Vec<Preset>,
}

/// Queue server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Allow cross-origin requests from spectator pages
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Spectator display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorConfig {
    /// Base URL of the queue server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_processed_capacity")]
    pub processed_capacity: usize,

    /// Where applied ids survive a restart; see [`SpectatorConfig::processed_file`]
    #[serde(default)]
    pub processed_path: Option<PathBuf>,

    #[serde(default)]
    pub digit_sum_search: DigitSumSearch,
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            token: None,
            poll_interval_ms: default_poll_interval_ms(),
            processed_capacity: default_processed_capacity(),
            processed_path: None,
            digit_sum_search: DigitSumSearch::default(),
        }
    }
}

impl SpectatorConfig {
    /// Persistence file for `token`, `tempra-processed-<token>.json` unless configured
    pub fn processed_file(&self, token: &Token) -> PathBuf {
        self.processed_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("tempra-processed-{token}.json")))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Warn about settings that work but fall outside recommendations
    pub fn check(&self) {
        let (low, high) = POLL_INTERVAL_BAND_MS;
        if !(low..=high).contains(&self.poll_interval_ms) {
            warn!(
                poll_interval_ms = self.poll_interval_ms,
                "poll interval outside the recommended {}-{} ms band", low, high
            );
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    400
}

fn default_processed_capacity() -> usize {
    DEFAULT_PROCESSED_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TempraConfig {
    /// Load defaults, then `path` (if any), then the environment
    pub fn load(path: Option<&str>) -> TempraResult<Self> {
        Self::build(path).map_err(|e| TempraError::Config(e.to_string()))
    }

    fn build(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&TempraConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TEMPRA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn preset_book(&self) -> TempraResult<PresetBook> {
        PresetBook::try_from(self.presets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TempraConfig::default();
        assert_eq!(config.server.listen_addr.port(), 3000);
        assert_eq!(config.spectator.poll_interval(), Duration::from_millis(400));
        assert_eq!(config.spectator.processed_capacity, 200);
        assert_eq!(config.spectator.digit_sum_search, DigitSumSearch::SameSecond);
        assert!(config.presets.is_empty());
    }

    #[test]
    fn test_processed_file_is_always_set() {
        let token = Token::new("AB12CD");
        let mut spectator = SpectatorConfig::default();
        assert_eq!(
            spectator.processed_file(&token),
            PathBuf::from("tempra-processed-AB12CD.json")
        );

        spectator.processed_path = Some(PathBuf::from("/var/lib/tempra/seen.json"));
        assert_eq!(
            spectator.processed_file(&token),
            PathBuf::from("/var/lib/tempra/seen.json")
        );
    }

    #[test]
    fn test_load_without_file() {
        let config = TempraConfig::load(None).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tempra.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
listen_addr = "0.0.0.0:4000"

[spectator]
poll_interval_ms = 350
digit_sum_search = {{ strategy = "forward", max_seconds = 5 }}

[[presets]]
name = "opener"
force_type = "ms"
force_sequence = [12, 34]
trigger = "lap"
"#
        )
        .unwrap();

        let config = TempraConfig::load(path.to_str()).unwrap();
        assert_eq!(config.server.listen_addr.port(), 4000);
        assert_eq!(config.spectator.poll_interval_ms, 350);
        assert_eq!(
            config.spectator.digit_sum_search,
            DigitSumSearch::Forward { max_seconds: 5 }
        );
        let book = config.preset_book().unwrap();
        assert!(book.get("opener").is_some());
    }
}
