//! Elevation service with request accounting.
//!
//! This module provides [`ElevationService`], the object handed to transport
//! layers. It owns one [`ElevationGrid`], counts requests and reports health.
//!
//! ```ignore
//! use demgrid::ElevationServiceBuilder;
//!
//! let service = ElevationServiceBuilder::new("data/elevation.bin", "data/elevation.bin.header")
//!     .cache_capacity(500_000)
//!     .build()?;
//!
//! let elevation = service.get_elevation(35.6812, 139.7671)?; // Tokyo Station
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::cache::{CacheStats, ResultCache, DEFAULT_CACHE_CAPACITY};
use crate::error::Result;
use crate::grid::{ElevationGrid, NO_DATA};
use crate::process;

/// Default location of the grid data file.
pub const DEFAULT_DATA_PATH: &str = "data/elevation.bin";

/// A coordinate submitted in a batch request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// The elevation resolved for a [`BatchPoint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationResult {
    /// Latitude as submitted.
    pub lat: f64,
    /// Longitude as submitted.
    pub lon: f64,
    /// Elevation in meters, or `-9999.0` for no data and rejected points.
    pub elevation: f64,
}

/// Point-in-time health snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    /// Always `"ok"` once the service is constructed.
    pub status: String,
    /// Resident memory of the process in MiB.
    pub memory_mb: u64,
    /// OS threads in the process.
    pub threads: usize,
    /// Seconds since the service was constructed.
    pub uptime_seconds: f64,
    /// Requests served so far. Batches count one per point.
    pub total_requests: u64,
}

/// Elevation lookups over a single in-memory grid.
///
/// Safe to share across threads (`Arc<ElevationService>`): the grid is
/// immutable, the cache synchronizes internally and the request counter is
/// atomic.
pub struct ElevationService {
    grid: ElevationGrid,
    started_at: Instant,
    requests: AtomicU64,
}

impl ElevationService {
    /// Load the grid from disk with default cache settings.
    ///
    /// # Errors
    ///
    /// Fails if the header exists but is malformed, or the data file exists
    /// with the wrong size. See [`ElevationGrid::load_with_cache`].
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(data_path: P, header_path: Q) -> Result<Self> {
        ElevationServiceBuilder::new(data_path, header_path).build()
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>, Q: AsRef<Path>>(
        data_path: P,
        header_path: Q,
    ) -> ElevationServiceBuilder {
        ElevationServiceBuilder::new(data_path, header_path)
    }

    /// Wrap an already-built grid.
    pub fn from_grid(grid: ElevationGrid) -> Self {
        Self {
            grid,
            started_at: Instant::now(),
            requests: AtomicU64::new(0),
        }
    }

    /// Get the elevation in meters at the given coordinates.
    ///
    /// Counts as one request, including when the lookup fails.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GridError::OutOfBounds`] outside the grid's bounding box.
    pub fn get_elevation(&self, lat: f64, lon: f64) -> Result<f64> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.grid.sample(lat, lon)
    }

    /// Get elevations for a batch of points.
    ///
    /// Counts as one request per point. Always returns one result per input
    /// point, in order; points that cannot be resolved get `-9999.0`.
    pub fn get_batch(&self, points: &[BatchPoint]) -> Vec<ElevationResult> {
        self.requests.fetch_add(points.len() as u64, Ordering::Relaxed);

        points
            .iter()
            .map(|p| ElevationResult {
                lat: p.lat,
                lon: p.lon,
                elevation: self
                    .grid
                    .sample(p.lat, p.lon)
                    .unwrap_or(f64::from(NO_DATA)),
            })
            .collect()
    }

    /// Snapshot of service health. Does not touch the grid.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            memory_mb: process::resident_memory_bytes() / (1024 * 1024),
            threads: process::thread_count(),
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
            total_requests: self.total_requests(),
        }
    }

    /// Requests served so far.
    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Get result cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.grid.cache().stats()
    }

    /// Returns the underlying grid.
    pub fn grid(&self) -> &ElevationGrid {
        &self.grid
    }
}

/// Builder for creating [`ElevationService`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use demgrid::ElevationServiceBuilder;
///
/// let service = ElevationServiceBuilder::new("data/elevation.bin", "data/elevation.bin.header")
///     .cache_capacity(100_000)
///     .cache_ttl(Duration::from_secs(3600))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ElevationServiceBuilder {
    data_path: PathBuf,
    header_path: PathBuf,
    cache_capacity: u64,
    cache_ttl: Option<Duration>,
}

impl ElevationServiceBuilder {
    /// Create a new builder for the given data and header files.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(data_path: P, header_path: Q) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            header_path: header_path.as_ref().to_path_buf(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DEMGRID_DATA_PATH` | Grid data file | `data/elevation.bin` |
    /// | `DEMGRID_HEADER_PATH` | Grid header file | `<data path>.header` |
    /// | `DEMGRID_CACHE_SIZE` | Maximum cached results | 1000000 |
    /// | `DEMGRID_CACHE_TTL_SECS` | Lifetime of a cached result | None |
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let data_path = std::env::var("DEMGRID_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let header_path = std::env::var("DEMGRID_HEADER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_header_path(&data_path));

        let cache_capacity: u64 = std::env::var("DEMGRID_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_CAPACITY);

        let cache_ttl = std::env::var("DEMGRID_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        Self {
            data_path,
            header_path,
            cache_capacity,
            cache_ttl,
        }
    }

    /// Set the data file path.
    pub fn data_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the header file path.
    pub fn header_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.header_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the maximum number of cached results.
    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Expire cached results after `ttl`.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Returns the configured data file path.
    pub fn data_file(&self) -> &Path {
        &self.data_path
    }

    /// Returns the configured header file path.
    pub fn header_file(&self) -> &Path {
        &self.header_path
    }

    /// Load the grid and build the [`ElevationService`].
    pub fn build(self) -> Result<ElevationService> {
        let cache = ResultCache::with_ttl(self.cache_capacity, self.cache_ttl);
        let grid = ElevationGrid::load_with_cache(&self.data_path, &self.header_path, cache)?;
        Ok(ElevationService::from_grid(grid))
    }
}

/// Header path conventionally stored next to a data file (`<data>.header`).
pub fn default_header_path(data_path: &Path) -> PathBuf {
    let mut name = data_path.as_os_str().to_os_string();
    name.push(".header");
    PathBuf::from(name)
}
