//! Error types for the demgrid library.

use thiserror::Error;

/// Errors that can occur when loading or querying an elevation grid.
#[derive(Error, Debug)]
pub enum GridError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Header file is present but cannot be used.
    #[error("Invalid grid header: {reason}")]
    InvalidHeader { reason: String },

    /// Data file size doesn't match the geometry declared by the header.
    #[error("Data file size mismatch: expected {expected} bytes, got {actual} bytes")]
    DataSizeMismatch { expected: u64, actual: u64 },

    /// In-memory cell buffer doesn't match the header geometry.
    #[error("Cell count mismatch: expected {expected} cells, got {actual}")]
    DataLengthMismatch { expected: usize, actual: usize },

    /// Coordinates are outside the grid's bounding box.
    #[error("Coordinates out of bounds: lat={lat}, lon={lon}")]
    OutOfBounds { lat: f64, lon: f64 },
}

/// Result type alias using [`GridError`].
pub type Result<T> = std::result::Result<T, GridError>;
