//! Service configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! environment variables.
//!
//! ```yaml
//! server:
//!   port: 8080
//!   request_timeout_secs: 10
//!   shutdown_timeout_secs: 30
//!   max_batch_size: 1000
//!   metrics_interval_secs: 60
//!   worker_threads: 8
//! data:
//!   data_path: data/elevation.bin
//!   header_path: data/elevation.bin.header
//! cache:
//!   capacity: 1000000
//!   ttl_secs: 3600
//! ```
//!
//! Relative data paths are resolved against `data.base_dir`, which defaults
//! to the directory holding the executable.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use demgrid::service::{default_header_path, DEFAULT_DATA_PATH};
use demgrid::ElevationServiceBuilder;
use serde::Deserialize;
use thiserror::Error;

/// Default location of the YAML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`ServiceConfig`].
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub cache: CacheConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Upper bound on handling a single request.
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight requests to finish on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Largest accepted batch request.
    pub max_batch_size: usize,
    /// Interval between health log lines. 0 disables them.
    pub metrics_interval_secs: u64,
    /// Runtime worker threads. Unset or 0 uses one per CPU core.
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout_secs: 10,
            shutdown_timeout_secs: 30,
            max_batch_size: 1000,
            metrics_interval_secs: 60,
            worker_threads: None,
        }
    }
}

/// Grid file locations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Grid data file.
    pub data_path: PathBuf,
    /// Grid header file. Defaults to `<data_path>.header`.
    pub header_path: Option<PathBuf>,
    /// Directory relative paths are resolved against.
    pub base_dir: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            header_path: None,
            base_dir: None,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached results.
    pub capacity: u64,
    /// Lifetime of a cached result, unlimited if unset.
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: demgrid::cache::DEFAULT_CACHE_CAPACITY,
            ttl_secs: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `path` (if it exists) and the process environment.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a YAML file, falling back to defaults if it does not exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Apply overrides from a variable lookup (normally the environment).
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `PORT` / `DEMGRID_PORT` | `server.port` (`DEMGRID_PORT` wins) |
    /// | `DEMGRID_MAX_BATCH_SIZE` | `server.max_batch_size` |
    /// | `DEMGRID_WORKER_THREADS` | `server.worker_threads` |
    /// | `DEMGRID_DATA_PATH` | `data.data_path` |
    /// | `DEMGRID_HEADER_PATH` | `data.header_path` |
    /// | `DEMGRID_BASE_DIR` | `data.base_dir` |
    /// | `DEMGRID_CACHE_SIZE` | `cache.capacity` |
    /// | `DEMGRID_CACHE_TTL_SECS` | `cache.ttl_secs` |
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        for key in ["PORT", "DEMGRID_PORT"] {
            if let Some(port) = lookup(key).and_then(|v| v.trim().parse().ok()) {
                self.server.port = port;
            }
        }
        if let Some(size) = parsed("DEMGRID_MAX_BATCH_SIZE") {
            self.server.max_batch_size = size as usize;
        }
        if let Some(threads) = parsed("DEMGRID_WORKER_THREADS") {
            self.server.worker_threads = Some(threads as usize);
        }
        if let Some(path) = lookup("DEMGRID_DATA_PATH") {
            self.data.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("DEMGRID_HEADER_PATH") {
            self.data.header_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("DEMGRID_BASE_DIR") {
            self.data.base_dir = Some(PathBuf::from(dir));
        }
        if let Some(capacity) = parsed("DEMGRID_CACHE_SIZE") {
            self.cache.capacity = capacity;
        }
        if let Some(ttl) = parsed("DEMGRID_CACHE_TTL_SECS") {
            self.cache.ttl_secs = Some(ttl);
        }
    }

    /// Resolved `(data, header)` paths.
    pub fn resolved_paths(&self, fallback_base: &Path) -> (PathBuf, PathBuf) {
        let base = self.data.base_dir.as_deref().unwrap_or(fallback_base);
        let data_path = resolve(base, &self.data.data_path);
        let header_path = match &self.data.header_path {
            Some(path) => resolve(base, path),
            None => default_header_path(&data_path),
        };
        (data_path, header_path)
    }

    /// Builder for the elevation service described by this configuration.
    pub fn service_builder(&self, fallback_base: &Path) -> ElevationServiceBuilder {
        let (data_path, header_path) = self.resolved_paths(fallback_base);
        let mut builder =
            ElevationServiceBuilder::new(data_path, header_path).cache_capacity(self.cache.capacity);
        if let Some(ttl) = self.cache.ttl_secs {
            builder = builder.cache_ttl(Duration::from_secs(ttl));
        }
        builder
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Explicit worker thread count for the runtime, if one was configured.
    pub fn runtime_worker_threads(&self) -> Option<usize> {
        self.worker_threads.filter(|&n| n > 0)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Directory holding the running executable, or `.` if it cannot be determined.
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_batch_size, 1000);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.data.data_path, PathBuf::from("data/elevation.bin"));
        assert_eq!(config.cache.ttl_secs, None);
        assert_eq!(config.server.runtime_worker_threads(), None);
    }

    #[test]
    fn test_worker_threads() {
        let config = ServiceConfig::from_yaml("server:\n  worker_threads: 4\n").unwrap();
        assert_eq!(config.server.runtime_worker_threads(), Some(4));

        let config = ServiceConfig::from_yaml("server:\n  worker_threads: 0\n").unwrap();
        assert_eq!(config.server.runtime_worker_threads(), None);

        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| (key == "DEMGRID_WORKER_THREADS").then(|| "2".to_string()));
        assert_eq!(config.server.runtime_worker_threads(), Some(2));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "server:\n  port: 9090\ncache:\n  ttl_secs: 600\n";
        let config = ServiceConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.max_batch_size, 1000);
        assert_eq!(config.cache.ttl_secs, Some(600));
        assert_eq!(config.data, DataConfig::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ServiceConfig::from_yaml("").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  port: not-a-port\n").unwrap();

        let result = ServiceConfig::from_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServiceConfig::from_file(&temp_dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "3000"),
            ("DEMGRID_DATA_PATH", "/srv/grid.bin"),
            ("DEMGRID_CACHE_SIZE", "42"),
            ("DEMGRID_CACHE_TTL_SECS", "bogus"),
            ("DEMGRID_MAX_BATCH_SIZE", "10"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.max_batch_size, 10);
        assert_eq!(config.data.data_path, PathBuf::from("/srv/grid.bin"));
        assert_eq!(config.cache.capacity, 42);
        assert_eq!(config.cache.ttl_secs, None);
    }

    #[test]
    fn test_service_port_override_wins() {
        let vars: HashMap<&str, &str> = [("PORT", "3000"), ("DEMGRID_PORT", "4000")]
            .into_iter()
            .collect();

        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_resolved_paths() {
        let config = ServiceConfig::default();
        let (data, header) = config.resolved_paths(Path::new("/opt/demgrid"));
        assert_eq!(data, PathBuf::from("/opt/demgrid/data/elevation.bin"));
        assert_eq!(header, PathBuf::from("/opt/demgrid/data/elevation.bin.header"));

        let mut config = ServiceConfig::default();
        config.data.data_path = PathBuf::from("/srv/grid.bin");
        config.data.header_path = Some(PathBuf::from("meta/grid.header"));
        config.data.base_dir = Some(PathBuf::from("/var/lib/demgrid"));
        let (data, header) = config.resolved_paths(Path::new("/opt/demgrid"));
        assert_eq!(data, PathBuf::from("/srv/grid.bin"));
        assert_eq!(header, PathBuf::from("/var/lib/demgrid/meta/grid.header"));
    }
}
