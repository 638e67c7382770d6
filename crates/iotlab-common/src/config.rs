//! ---
//! iotlab_section: "01-core-functionality"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Shared primitives and utilities for the lab services."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_sensors_dir() -> PathBuf {
    PathBuf::from("sensors")
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_device_peer() -> SocketAddr {
    SocketAddr::from(([192, 168, 89, 32], 10001))
}

fn default_device_key() -> String {
    "GPIO4".to_owned()
}

fn default_device_interval() -> Duration {
    Duration::from_millis(1000)
}

/// Primary configuration object for the lab services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "IOTLAB_CONFIG";

    /// Load configuration from disk, respecting the `IOTLAB_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        match Self::locate(candidates)? {
            Some(loaded) => Ok(loaded),
            None => Err(anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    /// Like [`AppConfig::load_with_source`] but falls back to defaults when no
    /// candidate exists. A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        match Self::locate(candidates)? {
            Some(loaded) => Ok(loaded),
            None => {
                debug!("no configuration file found; using defaults");
                Ok(LoadedAppConfig {
                    config: AppConfig::default(),
                    source: None,
                })
            }
        }
    }

    fn locate<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<LoadedAppConfig>> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: Some(path),
                }));
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: Some(path),
                }));
            }
        }
        Ok(None)
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialise configuration")
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.device.validate()?;
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
pub struct ApiConfig {
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
        }
    }
}

/// Where sensor configurations and text files are kept.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_sensors_dir")]
    pub sensors_dir: PathBuf,
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            sensors_dir: default_sensors_dir(),
            files_dir: default_files_dir(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::Filesystem {
            if self.sensors_dir.as_os_str().is_empty() {
                return Err(anyhow!("storage.sensors_dir must not be empty"));
            }
            if self.files_dir.as_os_str().is_empty() {
                return Err(anyhow!("storage.files_dir must not be empty"));
            }
        }
        Ok(())
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
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Target device for the datagram command sender.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_peer")]
    pub peer: SocketAddr,
    #[serde(default = "default_device_key")]
    pub key: String,
    #[serde(default = "default_device_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            peer: default_device_peer(),
            key: default_device_key(),
            interval: default_device_interval(),
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(anyhow!("device.key must not be empty"));
        }
        if self.key.contains('=') {
            return Err(anyhow!("device.key must not contain '='"));
        }
        if self.interval.is_zero() {
            return Err(anyhow!("device.interval must be greater than zero"));
        }
        Ok(())
    }
}
