use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "handoff-monitor.toml";

/// Main configuration structure for the handoff monitor
///
/// Built once at process start and handed to every component; nothing reads
/// configuration from globals.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HandoffConfig {
    /// Document locations
    pub paths: PathsConfig,
    /// Default SLA thresholds for new requests
    pub sla: SlaThresholds,
    /// Poll loop settings
    pub monitor: MonitorConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory holding logs, handoff documents and the heartbeat
    pub events_dir: PathBuf,
    /// State document; defaults to `<events_dir>/executor-state.json`
    pub state_file: Option<PathBuf>,
    /// Heartbeat document, relative to `events_dir` unless absolute
    pub heartbeat_file: PathBuf,
}

/// SLA budgets in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SlaThresholds {
    pub ack_minutes: u64,
    pub result_minutes: u64,
    pub fallback_minutes: u64,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            ack_minutes: 15,
            result_minutes: 60,
            fallback_minutes: 240,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Evaluate immediately, then on every poll interval until terminated
    Continuous,
    /// Evaluate once and exit, for externally scheduled invocation
    SingleShot,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitorConfig {
    pub mode: RunMode,
    pub poll_interval_ms: u64,
    /// Re-raise ACK/RESULT timeout alerts on every tick instead of once per request
    pub repeat_timeout_alerts: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Default log filter directive when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                events_dir: PathBuf::from(".handoff/events"),
                state_file: None,
                heartbeat_file: PathBuf::from("gemini-heartbeat.json"),
            },
            sla: SlaThresholds::default(),
            monitor: MonitorConfig {
                mode: RunMode::Continuous,
                poll_interval_ms: 5000,
                repeat_timeout_alerts: false,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
        }
    }
}

impl HandoffConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`handoff-monitor.toml` or an explicit path)
    /// 3. Environment variables (prefixed with `HANDOFF_`, `__` between sections)
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match config_file {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("HANDOFF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Effective state document path
    pub fn state_file(&self) -> PathBuf {
        self.paths
            .state_file
            .clone()
            .unwrap_or_else(|| self.paths.events_dir.join("executor-state.json"))
    }

    /// Effective heartbeat document path
    pub fn heartbeat_file(&self) -> PathBuf {
        if self.paths.heartbeat_file.is_absolute() {
            self.paths.heartbeat_file.clone()
        } else {
            self.paths.events_dir.join(&self.paths.heartbeat_file)
        }
    }
}
