use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::retry::RetryConfig;

/// Main configuration structure for the engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PragatiConfig {
    /// Workflow and aggregation tuning
    pub engine: EngineConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Escalation thresholds for national oversight
    pub escalation: EscalationConfig,
    /// Time-based delay detection
    pub delay: DelayConfig,
    /// Per-project lock and retry tuning
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EscalationConfig {
    /// A fund request escalates when it exceeds this fraction of the
    /// project's remaining allocation
    pub fund_pressure_ratio: f64,
    /// Cap on the escalation list in a national summary
    pub max_escalations: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelayConfig {
    /// An overdue project counts as delayed only after this many days
    /// without an approved update
    pub stale_after_days: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Upper bound on waiting for a project's critical section
    pub lock_timeout_ms: u64,
    /// Backoff for transient storage failures
    pub retry: RetryConfig,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            fund_pressure_ratio: 0.5,
            max_escalations: 20,
        }
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level directive when RUST_LOG is unset
    pub log_level: String,
    /// Emit log lines as JSON
    pub json_logs: bool,
}

impl Default for PragatiConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                escalation: EscalationConfig::default(),
                delay: DelayConfig::default(),
                storage: StorageConfig {
                    lock_timeout_ms: 2000,
                    retry: RetryConfig::default(),
                },
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
        }
    }
}

impl PragatiConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Configuration files (pragati.toml, .pragati-rc)
    /// 3. Environment variables (prefixed with PRAGATI_)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&PragatiConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("pragati.toml").exists() {
            builder = builder.add_source(File::with_name("pragati"));
        }

        if Path::new(".pragati-rc").exists() {
            builder = builder.add_source(File::with_name(".pragati-rc"));
        }

        builder = builder.add_source(
            Environment::with_prefix("PRAGATI")
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
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<PragatiConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = PragatiConfig::load_env_file();
        PragatiConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static PragatiConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
