use crate::options::{ErrorHandling, ErrorLog, HandlerOptions};
use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Top-level exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub handler: HandlerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener settings for the metrics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    /// Count exposition requests by status code on the served registry.
    #[serde(default = "default_true")]
    pub instrument: bool,
}

/// Exposition handler behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub error_handling: ErrorHandling,
    #[serde(default)]
    pub disable_compression: bool,
    /// Route gather/encode errors to the process log.
    #[serde(default)]
    pub log_errors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:9464".into() }
fn default_metrics_path() -> String { "/metrics".into() }
fn default_log_level() -> String { "info".into() }
fn default_true() -> bool { true }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            metrics_path: default_metrics_path(),
            instrument: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ExporterConfig {
    /// Load configuration from YAML file + env overrides.
    ///
    /// Env keys are `VITRINE_` prefixed, nested with `__`
    /// (e.g. `VITRINE_HANDLER__ERROR_HANDLING=continue`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: ExporterConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("VITRINE_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.server.metrics_path.starts_with('/') {
            anyhow::bail!(
                "server.metrics_path must start with '/', got {:?}",
                self.server.metrics_path
            );
        }
        if self.server.metrics_path == "/health" {
            anyhow::bail!("server.metrics_path collides with the /health endpoint");
        }
        Ok(())
    }
}

impl HandlerConfig {
    /// Build handler options. `error_log` is only attached when `log_errors` is set.
    pub fn to_options(&self, error_log: Option<Arc<dyn ErrorLog>>) -> HandlerOptions {
        HandlerOptions {
            error_log: if self.log_errors { error_log } else { None },
            error_handling: self.error_handling,
            disable_compression: self.disable_compression,
        }
    }
}
