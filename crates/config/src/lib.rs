//! Layered configuration.
//!
//! Values are resolved from, in increasing priority:
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed with `OUTSYNC_`, using `__` to reach
//!    nested keys (`OUTSYNC_CACHE__CAPACITY_BYTES=1048576`).

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use outsync_library::DEFAULT_CONFIGURATION_SEGMENT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "OUTSYNC_";
pub const DEFAULT_CACHE_CAPACITY: usize = 256 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,
    pub library: LibraryConfig,
    /// Where remote artifact bytes are fetched from. Without one, every
    /// artifact is treated as local.
    pub remote: Option<RemoteConfig>,
    /// Only treat records under this output path as remote.
    pub remote_path_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on the bytes held by the prefetch cache.
    pub capacity_bytes: usize,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity_bytes: DEFAULT_CACHE_CAPACITY }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    pub max_concurrent_fetches: usize,
}
impl Default for PrefetchConfig {
    fn default() -> Self {
        Self { max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Index of the path segment naming the build configuration.
    pub configuration_segment: usize,
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self { configuration_segment: DEFAULT_CONFIGURATION_SEGMENT }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteConfig {
    /// A content-addressed directory on local (or network mounted) disk.
    Local { path: PathBuf },
    /// An S3-compatible bucket.
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        key_id: String,
        key_secret: String,
    },
}

impl Config {
    /// Load from the default sources, reading `path` (or the per-user default
    /// location when `None`) as the configuration file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        Self::from_figment(Self::figment(path.as_deref())?)
    }

    /// `<user config dir>/outsync/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "outsync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The provider stack, before extraction. Missing files are skipped.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::Invalid(format!(
                    "unsupported configuration file format: {}",
                    path.display()
                ))),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity_bytes == 0 {
            exn::bail!(ErrorKind::Invalid("cache.capacity_bytes must be greater than zero".to_string()));
        }
        if self.prefetch.max_concurrent_fetches == 0 {
            exn::bail!(ErrorKind::Invalid("prefetch.max_concurrent_fetches must be greater than zero".to_string()));
        }
        match &self.remote {
            Some(RemoteConfig::Local { path }) if path.as_os_str().is_empty() => {
                exn::bail!(ErrorKind::Invalid("remote.path must not be empty".to_string()));
            },
            Some(RemoteConfig::S3 { bucket, .. }) if bucket.is_empty() => {
                exn::bail!(ErrorKind::Invalid("remote.bucket must not be empty".to_string()));
            },
            _ => {},
        }
        Ok(())
    }
}
