//! Node configuration.
//!
//! Loaded from a YAML file; every field has a default so an empty or missing
//! file yields a working in-memory node.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratus_storage::{CacheConfig, CachePolicy};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`Config`].
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field has an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the Stratus node.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address.
    pub listen: SocketAddr,
    /// Log level.
    pub log_level: String,
    /// Emit JSON logs.
    pub json_logs: bool,
    /// Object store.
    pub storage: StorageConfig,
    /// Read caches.
    pub cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            json_logs: false,
            storage: StorageConfig::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Config {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a YAML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(yaml) => Self::from_yaml(&yaml),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.storage.backend {
            BackendKind::Memory => {}
            BackendKind::Local if self.storage.root.is_none() => {
                return Err(ConfigError::Invalid(
                    "storage.root is required for the local backend".to_string(),
                ))
            }
            BackendKind::Local => {}
            BackendKind::S3 if self.storage.bucket.as_deref().unwrap_or("").is_empty() => {
                return Err(ConfigError::Invalid(
                    "storage.bucket is required for the s3 backend".to_string(),
                ))
            }
            BackendKind::S3 => {}
        }
        if self.storage.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "storage.timeout_secs must be positive".to_string(),
            ));
        }
        for (name, policy) in [
            ("objects", &self.cache.objects),
            ("refs", &self.cache.refs),
            ("listings", &self.cache.listings),
        ] {
            if policy.capacity == 0 {
                return Err(ConfigError::Invalid(format!(
                    "cache.{}.capacity must be positive",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Which object store holds the repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// A local directory.
    Local,
    /// An S3-compatible bucket.
    S3,
}

/// Object store settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind.
    pub backend: BackendKind,
    /// Root directory for the local backend.
    pub root: Option<PathBuf>,
    /// Bucket for the s3 backend.
    pub bucket: Option<String>,
    /// Region for the s3 backend.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
    /// Upper bound on every object store call.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            root: None,
            bucket: None,
            region: None,
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

impl StorageConfig {
    /// Timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Capacity and TTL of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheEntrySettings {
    /// Maximum entries.
    pub capacity: usize,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
}

impl From<CachePolicy> for CacheEntrySettings {
    fn from(policy: CachePolicy) -> Self {
        Self {
            capacity: policy.capacity,
            ttl_secs: policy.ttl.as_secs(),
        }
    }
}

impl From<CacheEntrySettings> for CachePolicy {
    fn from(settings: CacheEntrySettings) -> Self {
        CachePolicy::new(settings.capacity, Duration::from_secs(settings.ttl_secs))
    }
}

/// Settings for the three read caches.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub objects: CacheEntrySettings,
    pub refs: CacheEntrySettings,
    pub listings: CacheEntrySettings,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            objects: defaults.objects.into(),
            refs: defaults.refs.into(),
            listings: defaults.listings.into(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        CacheConfig {
            objects: settings.objects.into(),
            refs: settings.refs.into(),
            listings: settings.listings.into(),
        }
    }
}
