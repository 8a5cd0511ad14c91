//! Grid geometry header parsing.
//!
//! The header is a fixed 48-byte little-endian record written next to the
//! data file by the conversion tooling:
//!
//! | Offset | Field       | Type |
//! |--------|-------------|------|
//! | 0      | `width`     | i32  |
//! | 4      | `height`    | i32  |
//! | 8      | `min_lat`   | f64  |
//! | 16     | `max_lat`   | f64  |
//! | 24     | `min_lon`   | f64  |
//! | 32     | `max_lon`   | f64  |
//! | 40     | `grid_size` | f64  |

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{GridError, Result};

/// Size in bytes of an encoded [`GridHeader`].
pub const HEADER_SIZE: usize = 48;

/// Number of bytes used by one cell in the data file.
pub const BYTES_PER_CELL: u64 = 2;

/// Geometry of an elevation grid.
///
/// Rows run south to north and columns west to east, so cell `(row, col)`
/// covers the patch starting at `(min_lat + row * grid_size, min_lon + col * grid_size)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHeader {
    /// Number of columns.
    pub width: i32,
    /// Number of rows.
    pub height: i32,
    /// Southern boundary (inclusive).
    pub min_lat: f64,
    /// Northern boundary (inclusive).
    pub max_lat: f64,
    /// Western boundary (inclusive).
    pub min_lon: f64,
    /// Eastern boundary (inclusive).
    pub max_lon: f64,
    /// Cell edge length in degrees, shared by both axes.
    pub grid_size: f64,
}

impl Default for GridHeader {
    /// Geometry used when no header file is present: the Japanese archipelago
    /// at 0.001° (~100m) resolution.
    fn default() -> Self {
        Self {
            width: 32000,
            height: 26000,
            min_lat: 20.0,
            max_lat: 46.0,
            min_lon: 122.0,
            max_lon: 154.0,
            grid_size: 0.001,
        }
    }
}

impl GridHeader {
    /// Decode a header from its on-disk representation.
    ///
    /// Bytes past the first [`HEADER_SIZE`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidHeader`] if the buffer is too short or the
    /// decoded geometry is inconsistent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(GridError::InvalidHeader {
                reason: format!("expected {} bytes, got {}", HEADER_SIZE, bytes.len()),
            });
        }

        let header = Self {
            width: read_i32(bytes, 0),
            height: read_i32(bytes, 4),
            min_lat: read_f64(bytes, 8),
            max_lat: read_f64(bytes, 16),
            min_lon: read_f64(bytes, 24),
            max_lon: read_f64(bytes, 32),
            grid_size: read_f64(bytes, 40),
        };
        header.validate()?;

        Ok(header)
    }

    /// Encode the header into its on-disk representation.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.width.to_le_bytes());
        buf[4..8].copy_from_slice(&self.height.to_le_bytes());
        buf[8..16].copy_from_slice(&self.min_lat.to_le_bytes());
        buf[16..24].copy_from_slice(&self.max_lat.to_le_bytes());
        buf[24..32].copy_from_slice(&self.min_lon.to_le_bytes());
        buf[32..40].copy_from_slice(&self.max_lon.to_le_bytes());
        buf[40..48].copy_from_slice(&self.grid_size.to_le_bytes());
        buf
    }

    /// Read a header file.
    ///
    /// Returns `Ok(None)` if the file does not exist so the caller can fall
    /// back to [`GridHeader::default`]. Any other failure is an error.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path.as_ref()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() > HEADER_SIZE {
            tracing::warn!(
                path = %path.as_ref().display(),
                extra_bytes = bytes.len() - HEADER_SIZE,
                "Ignoring trailing bytes after grid header"
            );
        }

        Self::from_bytes(&bytes).map(Some)
    }

    /// Check the geometry invariants.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.width <= 0 || self.height <= 0 {
            format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )
        } else if !(self.min_lat < self.max_lat) {
            format!(
                "min_lat ({}) must be below max_lat ({})",
                self.min_lat, self.max_lat
            )
        } else if !(self.min_lon < self.max_lon) {
            format!(
                "min_lon ({}) must be below max_lon ({})",
                self.min_lon, self.max_lon
            )
        } else if !(self.grid_size > 0.0 && self.grid_size.is_finite()) {
            format!("grid_size must be positive, got {}", self.grid_size)
        } else {
            return Ok(());
        };

        Err(GridError::InvalidHeader { reason })
    }

    /// Total number of cells (`width * height`).
    pub fn cell_count(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize
    }

    /// Exact size the data file must have for this geometry.
    pub fn data_size_bytes(&self) -> u64 {
        self.cell_count() as u64 * BYTES_PER_CELL
    }

    /// Whether the coordinate lies inside the bounding box (inclusive on all edges).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

fn read_f64(buf: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_header() -> GridHeader {
        GridHeader {
            width: 1000,
            height: 1000,
            min_lat: 35.0,
            max_lat: 36.0,
            min_lon: 138.0,
            max_lon: 139.0,
            grid_size: 0.001,
        }
    }

    #[test]
    fn test_default_geometry() {
        let header = GridHeader::default();
        assert_eq!(header.width, 32000);
        assert_eq!(header.height, 26000);
        assert_eq!(header.cell_count(), 832_000_000);
        assert_eq!(header.data_size_bytes(), 1_664_000_000);
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_decode_known_layout() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&100i32.to_le_bytes());
        bytes.extend_from_slice(&50i32.to_le_bytes());
        for v in [35.0f64, 35.5, 139.0, 140.0, 0.01] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(bytes.len(), HEADER_SIZE);

        let header = GridHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.width, 100);
        assert_eq!(header.height, 50);
        assert_eq!(header.min_lat, 35.0);
        assert_eq!(header.max_lat, 35.5);
        assert_eq!(header.min_lon, 139.0);
        assert_eq!(header.max_lon, 140.0);
        assert_eq!(header.grid_size, 0.01);
        assert_eq!(header.to_bytes().as_slice(), bytes.as_slice());
    }

    #[test]
    fn test_short_header_rejected() {
        let bytes = sample_header().to_bytes();
        let result = GridHeader::from_bytes(&bytes[..20]);
        assert!(matches!(result, Err(GridError::InvalidHeader { .. })));
    }

    #[test]
    fn test_inconsistent_geometry_rejected() {
        let mut header = sample_header();
        header.width = 0;
        assert!(GridHeader::from_bytes(&header.to_bytes()).is_err());

        let mut header = sample_header();
        header.min_lat = 37.0;
        assert!(GridHeader::from_bytes(&header.to_bytes()).is_err());

        let mut header = sample_header();
        header.max_lon = header.min_lon;
        assert!(GridHeader::from_bytes(&header.to_bytes()).is_err());

        let mut header = sample_header();
        header.grid_size = f64::NAN;
        assert!(GridHeader::from_bytes(&header.to_bytes()).is_err());
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = GridHeader::read_from(dir.path().join("absent.header")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_from_file_with_trailing_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&sample_header().to_bytes()).unwrap();
        file.write_all(&[0xAB; 8]).unwrap();

        let header = GridHeader::read_from(file.path()).unwrap();
        assert_eq!(header, Some(sample_header()));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let header = sample_header();
        assert!(header.contains(35.0, 138.0));
        assert!(header.contains(36.0, 139.0));
        assert!(!header.contains(36.0001, 138.5));
        assert!(!header.contains(35.5, 137.9999));
        assert!(!header.contains(f64::NAN, 138.5));
    }
}
