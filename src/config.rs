use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the assistant service (no trailing slash needed)
    pub base_url: String,
    /// Per-request timeout; an expired request takes the network-error path
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5020".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the credential slot and per-user session lists
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "~/.issac".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    /// Input device name; the platform default when unset
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
            device: None,
        }
    }
}

/// `ISSAC_` prefix, then `__` between nested keys
fn environment() -> config::Environment {
    config::Environment::with_prefix("ISSAC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Config {
    /// Load configuration from an optional file plus `ISSAC_*` environment
    /// overrides (`ISSAC_SERVER__BASE_URL`, `ISSAC_STORAGE__PATH`, ...).
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&str>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("issac").required(false));
        }

        let settings = builder.add_source(env).build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Storage directory with `~` expanded
    pub fn storage_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.path).into_owned())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }
}
