//! ---
//! ecalc_section: "01-core-functionality"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "Shared configuration and tracing setup."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

const MIN_AMBIENT_C: f64 = -20.0;
const MAX_AMBIENT_C: f64 = 80.0;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_file_enabled() -> bool {
    true
}

fn default_reports_directory() -> PathBuf {
    PathBuf::from("reports")
}

fn default_single_phase_voltage() -> f64 {
    230.0
}

fn default_three_phase_voltage() -> f64 {
    400.0
}

fn default_ambient_temp() -> f64 {
    30.0
}

/// Primary configuration object for the ecalc tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub regulations: RegulationsConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults are in use.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "ECALC_CONFIG";

    /// Load configuration together with the effective source path.
    ///
    /// `ECALC_CONFIG` wins when set; it must point at a readable file. Otherwise
    /// the first existing candidate is used, falling back to defaults.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    /// Read and validate a TOML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.defaults.validate()?;
        if let Some(path) = &self.regulations.path {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("regulations.path must not be empty when set"));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Write a daily rolling JSON log file alongside the console output.
    #[serde(default = "default_file_enabled")]
    pub file_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_enabled: default_file_enabled(),
        }
    }
}

/// Optional override of the built-in regulatory thresholds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegulationsConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_reports_directory")]
    pub directory: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: default_reports_directory(),
        }
    }
}

/// Values the CLI falls back to when a flag is omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_single_phase_voltage")]
    pub single_phase_voltage_v: f64,
    #[serde(default = "default_three_phase_voltage")]
    pub three_phase_voltage_v: f64,
    #[serde(default = "default_ambient_temp")]
    pub ambient_temp_c: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            single_phase_voltage_v: default_single_phase_voltage(),
            three_phase_voltage_v: default_three_phase_voltage(),
            ambient_temp_c: default_ambient_temp(),
        }
    }
}

impl DefaultsConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("defaults.single_phase_voltage_v", self.single_phase_voltage_v),
            ("defaults.three_phase_voltage_v", self.three_phase_voltage_v),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(anyhow!("{name} must be a positive voltage (got {value})"));
            }
        }
        if !(MIN_AMBIENT_C..=MAX_AMBIENT_C).contains(&self.ambient_temp_c) {
            return Err(anyhow!(
                "defaults.ambient_temp_c must lie within {MIN_AMBIENT_C}..={MAX_AMBIENT_C} °C (got {})",
                self.ambient_temp_c
            ));
        }
        Ok(())
    }
}
