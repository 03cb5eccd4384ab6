//! Forge configuration
//!
//! Loaded from TOML; every section and field has a default so a missing
//! file or a partial file is fine. Selected fields can be overridden from
//! the environment (`FORGE_BACKEND_URL`, `FORGE_MODEL`, `FORGE_PROVIDER`,
//! `FORGE_LOG_LEVEL`).

use crate::error::ConfigError;
use crate::executor::ExecutorConfig;
use forge_blueprint::RasterLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Pending proposal lifetime
    pub proposals: ProposalConfig,
    /// Generation backend and gate
    pub generation: GenerationConfig,
    /// Batch execution pacing
    pub execution: ExecutionConfig,
    /// Rasterization limits
    pub raster: RasterConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// Proposal store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    /// Seconds an unreviewed proposal survives
    pub ttl_secs: u64,
    /// Seconds between expiry sweeps
    pub sweep_interval_secs: u64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

/// Generation backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Global cap on generations in flight
    pub max_concurrent: usize,
    /// Base URL of the chat backend
    pub backend_url: String,
    /// Provider name forwarded to the backend (`None` to omit)
    pub provider: String,
    /// Default model
    pub model: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Whether owners may pick their own model
    pub allow_model_override: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            backend_url: "http://127.0.0.1:9002".to_string(),
            provider: "Gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            request_timeout_secs: 120,
            allow_model_override: true,
        }
    }
}

/// Batch execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Commands dispatched concurrently per batch
    pub batch_size: usize,
    /// Pause between batches in milliseconds
    pub inter_batch_delay_ms: u64,
    /// Failure percentage above which execution aborts
    pub max_failure_percent: f64,
    /// Processed commands required before the abort check applies
    pub min_commands_for_abort: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            inter_batch_delay_ms: 50,
            max_failure_percent: 50.0,
            min_commands_for_abort: 20,
        }
    }
}

/// Rasterization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Per-cell instructions one definition may emit
    pub max_cells_per_definition: u64,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            max_cells_per_definition: RasterLimits::default().max_cells_per_definition,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ForgeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`, falling back to defaults when the file is absent,
    /// then apply environment overrides and validate
    ///
    /// # Errors
    /// - [`ConfigError::Io`] if the file exists but cannot be read
    /// - [`ConfigError::Parse`] on malformed TOML
    /// - [`ConfigError::Invalid`] if a value is out of range
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml_str(&text)?
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `FORGE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FORGE_BACKEND_URL") {
            self.generation.backend_url = url;
        }
        if let Some(model) = lookup("FORGE_MODEL") {
            self.generation.model = model;
        }
        if let Some(provider) = lookup("FORGE_PROVIDER") {
            self.generation.provider = provider;
        }
        if let Some(level) = lookup("FORGE_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.batch_size == 0 {
            return Err(ConfigError::Invalid("execution.batch_size must be at least 1".to_string()));
        }
        if !(0.0..=100.0).contains(&self.execution.max_failure_percent) {
            return Err(ConfigError::Invalid(format!(
                "execution.max_failure_percent must be within 0..=100 (got {})",
                self.execution.max_failure_percent
            )));
        }
        if self.generation.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.proposals.ttl_secs == 0 {
            return Err(ConfigError::Invalid("proposals.ttl_secs must be at least 1".to_string()));
        }
        if self.proposals.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "proposals.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Proposal lifetime
    #[inline]
    #[must_use]
    pub fn proposal_ttl(&self) -> Duration {
        Duration::from_secs(self.proposals.ttl_secs)
    }

    /// Sweep tick
    #[inline]
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.proposals.sweep_interval_secs)
    }

    /// Executor settings
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new()
            .with_batch_size(self.execution.batch_size)
            .with_inter_batch_delay(Duration::from_millis(self.execution.inter_batch_delay_ms))
            .with_max_failure_percent(self.execution.max_failure_percent)
            .with_min_commands_for_abort(self.execution.min_commands_for_abort)
    }

    /// Rasterizer limits
    #[inline]
    #[must_use]
    pub fn raster_limits(&self) -> RasterLimits {
        RasterLimits {
            max_cells_per_definition: self.raster.max_cells_per_definition,
        }
    }
}
