//! # demgrid - In-memory Elevation Grid
//!
//! Answers "what is the ground elevation at (lat, lon)?" from a dense,
//! regularly spaced grid of quantized samples held entirely in memory.
//!
//! ## Features
//!
//! - **Fast**: one multiply and one array read per uncached lookup
//! - **Lock-free reads**: the grid is immutable once loaded
//! - **Result cache**: bounded, concurrent cache keyed by the rounded coordinate
//! - **Runs without data**: missing files fall back to default geometry and
//!   synthetic samples
//!
//! ## Quick Start
//!
//! ```ignore
//! use demgrid::ElevationService;
//!
//! let service = ElevationService::new("data/elevation.bin", "data/elevation.bin.header")?;
//! let elevation = service.get_elevation(35.3606, 138.7274)?;
//! println!("Elevation: {}m", elevation);
//! ```
//!
//! ## Data Format
//!
//! A grid is stored as two files:
//!
//! - **Header** (`elevation.bin.header`): 48-byte little-endian record with
//!   width, height, bounding box and cell size. See [`header`].
//! - **Data** (`elevation.bin`): `width * height` little-endian `i16` samples,
//!   row-major from the south-west corner, in centimeters.
//!
//! The special value -9999 indicates no data and is returned unscaled.

pub mod cache;
pub mod error;
pub mod grid;
pub mod header;
pub mod process;
pub mod service;

// Re-export main types at crate root for convenience
pub use cache::{CacheStats, ResultCache};
pub use error::{GridError, Result};
pub use grid::{DataSource, ElevationGrid, NO_DATA};
pub use header::GridHeader;
pub use service::{
    BatchPoint, ElevationResult, ElevationService, ElevationServiceBuilder, HealthStatus,
};
