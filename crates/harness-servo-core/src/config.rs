//! Driver configuration, read from the `harness:` section of a YAML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CPU_MIN: f64 = 0.125;
pub const DEFAULT_CPU_MAX: f64 = 4.0;
pub const DEFAULT_CPU_STEP: f64 = 0.125;
pub const DEFAULT_MEM_MIN: f64 = 0.125;
pub const DEFAULT_MEM_MAX: f64 = 4.0;
pub const DEFAULT_MEM_STEP: f64 = 0.125;
pub const DEFAULT_ADJUST_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_OPSANI_URL: &str = "https://api.opsani.com";
pub const DEFAULT_HARNESS_URL: &str = "https://app.harness.io";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("harness configuration was not provided in {}", .0.display())]
    MissingSection(PathBuf),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level layout of the config file. Other drivers may share the file,
/// so unknown sections are ignored.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    harness: Option<HarnessConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Optimization service account.
    pub opsani_account: String,
    pub opsani_app_name: String,
    pub opsani_token: String,

    /// Workflow engine application id sent with every trigger.
    pub application: String,
    pub account_id: String,
    /// Webhook token of the canary adjust workflow trigger.
    pub adjust_token: String,
    /// Webhook token of the promote workflow trigger, if one exists.
    #[serde(default)]
    pub promote_token: Option<String>,
    pub api_key: String,

    #[serde(default = "default_adjust_timeout")]
    pub adjust_timeout: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "default_opsani_url")]
    pub opsani_url: String,
    #[serde(default = "default_harness_url")]
    pub harness_url: String,

    #[serde(default = "ResourceBounds::cpu")]
    pub cpu: ResourceBounds,
    #[serde(default = "ResourceBounds::mem")]
    pub mem: ResourceBounds,
}

/// Range and default for one tunable resource. Fields left out of the
/// file take the built-in defaults of that resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub default: Option<f64>,
}

impl ResourceBounds {
    pub fn cpu() -> Self {
        Self {
            min: Some(DEFAULT_CPU_MIN),
            max: Some(DEFAULT_CPU_MAX),
            step: Some(DEFAULT_CPU_STEP),
            default: None,
        }
    }

    pub fn mem() -> Self {
        Self {
            min: Some(DEFAULT_MEM_MIN),
            max: Some(DEFAULT_MEM_MAX),
            step: Some(DEFAULT_MEM_STEP),
            default: None,
        }
    }

    /// Fill unset fields from `fallback`.
    fn or(&self, fallback: &ResourceBounds) -> ResourceBounds {
        ResourceBounds {
            min: self.min.or(fallback.min),
            max: self.max.or(fallback.max),
            step: self.step.or(fallback.step),
            default: self.default.or(fallback.default),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let (min, max) = (self.min.unwrap_or(0.0), self.max.unwrap_or(0.0));
        if min > max {
            return Err(ConfigError::Invalid(format!(
                "{name}.min ({min}) is greater than {name}.max ({max})"
            )));
        }
        if let Some(step) = self.step {
            if step <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}.step must be positive, got {step}"
                )));
            }
        }
        if let Some(default) = self.default {
            if default < min || default > max {
                return Err(ConfigError::Invalid(format!(
                    "{name}.default ({default}) is outside [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }
}

impl HarnessConfig {
    /// Load and validate the `harness:` section of a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    /// Parse config text. `origin` is only used in error messages.
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Err(ConfigError::MissingSection(origin.to_path_buf()));
        }
        let file: Option<ConfigFile> =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        let mut config = file
            .and_then(|f| f.harness)
            .ok_or_else(|| ConfigError::MissingSection(origin.to_path_buf()))?;

        // A partially specified `cpu:` block still gets the built-in bounds.
        config.cpu = config.cpu_bounds();
        config.mem = config.mem_bounds();

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("opsani_account", &self.opsani_account),
            ("opsani_app_name", &self.opsani_app_name),
            ("opsani_token", &self.opsani_token),
            ("application", &self.application),
            ("account_id", &self.account_id),
            ("adjust_token", &self.adjust_token),
            ("api_key", &self.api_key),
            ("opsani_url", &self.opsani_url),
            ("harness_url", &self.harness_url),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{key} must not be empty")));
            }
        }
        if self.adjust_timeout == 0 {
            return Err(ConfigError::Invalid(
                "adjust_timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        self.cpu.validate("cpu")?;
        self.mem.validate("mem")?;
        Ok(())
    }

    /// CPU bounds with unset fields taken from the built-in defaults.
    pub fn cpu_bounds(&self) -> ResourceBounds {
        self.cpu.or(&ResourceBounds::cpu())
    }

    pub fn mem_bounds(&self) -> ResourceBounds {
        self.mem.or(&ResourceBounds::mem())
    }

    pub fn adjust_timeout(&self) -> Duration {
        Duration::from_secs(self.adjust_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

fn default_adjust_timeout() -> u64 {
    DEFAULT_ADJUST_TIMEOUT_SECS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_opsani_url() -> String {
    DEFAULT_OPSANI_URL.to_string()
}

fn default_harness_url() -> String {
    DEFAULT_HARNESS_URL.to_string()
}
