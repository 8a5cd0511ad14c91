//! In-memory elevation grid and nearest-cell sampling.
//!
//! This module provides [`ElevationGrid`], which owns the full sample array
//! for a [`GridHeader`] geometry and resolves coordinates to elevations.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::cache::{cache_key, ResultCache, DEFAULT_CACHE_CAPACITY};
use crate::error::{GridError, Result};
use crate::header::{GridHeader, BYTES_PER_CELL};

/// Value indicating no data at a cell.
pub const NO_DATA: i16 = -9999;

/// Synthetic landmark patches as `(min_lat, max_lat, min_lon, max_lon, centimeters)`.
const LANDMARKS: [(f64, f64, f64, f64, i16); 3] = [
    // Mt. Fuji summit
    (35.36, 35.37, 138.72, 138.73, 32767),
    // Tokyo Station
    (35.68, 35.69, 139.76, 139.77, 300),
    // Osaka Castle
    (34.68, 34.69, 135.52, 135.53, 2000),
];

/// Where the cell data of a grid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Read from the binary data file.
    File,
    /// Generated because the data file was missing.
    SyntheticMissing,
    /// Generated because the data file ended early while reading.
    SyntheticTruncated,
    /// Supplied directly by the caller.
    Memory,
}

/// A fully loaded elevation grid.
///
/// The cell array is never written after construction, so a grid can be
/// shared between threads and read without locking. Only the result cache
/// is mutated, and it synchronizes internally.
///
/// # Example
///
/// ```ignore
/// use demgrid::ElevationGrid;
///
/// let grid = ElevationGrid::load("data/elevation.bin", "data/elevation.bin.header")?;
/// let elevation = grid.sample(35.3606, 138.7274)?;
/// println!("Elevation: {}m", elevation);
/// ```
pub struct ElevationGrid {
    /// Row-major samples in centimeters, row 0 = southern edge.
    cells: Vec<i16>,
    header: GridHeader,
    width: usize,
    height: usize,
    inv_grid_size: f64,
    source: DataSource,
    cache: ResultCache,
}

impl ElevationGrid {
    /// Load a grid from a data file and its header with the default cache size.
    ///
    /// See [`Self::load_with_cache`] for the fallback rules.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(data_path: P, header_path: Q) -> Result<Self> {
        Self::load_with_cache(
            data_path,
            header_path,
            ResultCache::new(DEFAULT_CACHE_CAPACITY),
        )
    }

    /// Load a grid from a data file and its header.
    ///
    /// - A missing header falls back to [`GridHeader::default`]; a header that
    ///   exists but does not decode is an error.
    /// - A missing data file is replaced by synthetic data.
    /// - A data file whose size differs from `width * height * 2` bytes is an
    ///   error, with no fallback.
    /// - A data file that has the right size but ends early while being read
    ///   is replaced by synthetic data.
    ///
    /// The last two rules treat a short file differently depending on when the
    /// shortfall is noticed. Callers that need to tell the cases apart can check
    /// [`Self::source`].
    pub fn load_with_cache<P: AsRef<Path>, Q: AsRef<Path>>(
        data_path: P,
        header_path: Q,
        cache: ResultCache,
    ) -> Result<Self> {
        let header_path = header_path.as_ref();
        let header = match GridHeader::read_from(header_path)? {
            Some(header) => header,
            None => {
                tracing::warn!(
                    path = %header_path.display(),
                    "Grid header not found, using default geometry"
                );
                GridHeader::default()
            }
        };

        let (cells, source) = load_cells(data_path.as_ref(), &header)?;

        tracing::info!(
            width = header.width,
            height = header.height,
            min_lat = header.min_lat,
            max_lat = header.max_lat,
            min_lon = header.min_lon,
            max_lon = header.max_lon,
            grid_size = header.grid_size,
            source = ?source,
            "Elevation grid loaded"
        );

        Ok(Self::assemble(header, cells, source, cache))
    }

    /// Build a grid from a header and an in-memory cell buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid or `cells.len()` is not
    /// `width * height`.
    pub fn from_cells(header: GridHeader, cells: Vec<i16>) -> Result<Self> {
        header.validate()?;
        if cells.len() != header.cell_count() {
            return Err(GridError::DataLengthMismatch {
                expected: header.cell_count(),
                actual: cells.len(),
            });
        }

        Ok(Self::assemble(
            header,
            cells,
            DataSource::Memory,
            ResultCache::new(DEFAULT_CACHE_CAPACITY),
        ))
    }

    /// Build a grid filled with synthetic data for the given geometry.
    pub fn synthetic(header: GridHeader) -> Result<Self> {
        header.validate()?;
        let cells = synthesize(&header);
        Ok(Self::assemble(
            header,
            cells,
            DataSource::SyntheticMissing,
            ResultCache::new(DEFAULT_CACHE_CAPACITY),
        ))
    }

    /// Replace the result cache, dropping everything cached so far.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    fn assemble(
        header: GridHeader,
        cells: Vec<i16>,
        source: DataSource,
        cache: ResultCache,
    ) -> Self {
        Self {
            cells,
            width: header.width as usize,
            height: header.height as usize,
            inv_grid_size: 1.0 / header.grid_size,
            header,
            source,
            cache,
        }
    }

    /// Get the elevation in meters at the specified coordinates.
    ///
    /// The coordinate is resolved to the cell it falls into; neighbouring
    /// cells are not blended. Results are cached under the coordinate rounded
    /// to four decimals, so later queries within that rounding share the
    /// first answer.
    ///
    /// # Returns
    ///
    /// The elevation in meters, or `-9999.0` if the cell holds [`NO_DATA`].
    /// No-data answers are never cached.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if the coordinate lies outside the
    /// bounding box. Edges are inclusive.
    pub fn sample(&self, lat: f64, lon: f64) -> Result<f64> {
        if !self.header.contains(lat, lon) {
            return Err(GridError::OutOfBounds { lat, lon });
        }

        let key = cache_key(lat, lon);
        if let Some(elevation) = self.cache.get(&key) {
            return Ok(elevation);
        }

        let (row, col) = self.cell_index(lat, lon);
        let raw = self.cells[row * self.width + col];
        if raw == NO_DATA {
            return Ok(f64::from(NO_DATA));
        }

        let elevation = f64::from(raw) / 100.0;
        self.cache.insert(key, elevation);

        Ok(elevation)
    }

    /// Get elevations for a batch of coordinates.
    ///
    /// Returns one value per input `(lat, lon)` pair in input order. Points
    /// that fail to resolve get `-9999.0` instead of failing the batch.
    pub fn sample_batch(&self, coords: &[(f64, f64)]) -> Vec<f64> {
        coords
            .iter()
            .map(|&(lat, lon)| self.sample(lat, lon).unwrap_or(f64::from(NO_DATA)))
            .collect()
    }

    /// Map an in-bounds coordinate to `(row, col)`, clamped to the grid.
    fn cell_index(&self, lat: f64, lon: f64) -> (usize, usize) {
        let col = ((lon - self.header.min_lon) * self.inv_grid_size).floor();
        let row = ((lat - self.header.min_lat) * self.inv_grid_size).floor();

        // Float-to-int casts saturate, so negative values land on 0.
        let col = (col as usize).min(self.width - 1);
        let row = (row as usize).min(self.height - 1);

        (row, col)
    }

    /// Raw centimeter value at a cell, if the indices are in range.
    pub fn cell(&self, row: usize, col: usize) -> Option<i16> {
        if row < self.height && col < self.width {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Returns the grid geometry.
    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    /// Returns where the cell data came from.
    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Returns the result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Approximate memory held by the cell array, in bytes.
    pub fn data_bytes(&self) -> usize {
        self.cells.len() * std::mem::size_of::<i16>()
    }
}

/// Read the data file, or synthesize cells when it is missing or truncated.
fn load_cells(path: &Path, header: &GridHeader) -> Result<(Vec<i16>, DataSource)> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(
                path = %path.display(),
                "Elevation data not found, generating synthetic grid"
            );
            return Ok((synthesize(header), DataSource::SyntheticMissing));
        }
        Err(e) => return Err(e.into()),
    };

    let expected = header.data_size_bytes();
    let actual = file.metadata()?.len();
    if actual != expected {
        return Err(GridError::DataSizeMismatch { expected, actual });
    }

    cells_from_reader(file, path, header)
}

/// Decode a data file whose size already matched the header.
///
/// The file can still come up short if it shrinks while being read; that
/// case is answered with synthetic cells rather than an error.
fn cells_from_reader<R: Read>(
    reader: R,
    path: &Path,
    header: &GridHeader,
) -> Result<(Vec<i16>, DataSource)> {
    match read_cells(reader, header.cell_count()) {
        Ok(cells) => Ok((cells, DataSource::File)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            tracing::warn!(
                path = %path.display(),
                "Elevation data ended early, generating synthetic grid"
            );
            Ok((synthesize(header), DataSource::SyntheticTruncated))
        }
        Err(e) => Err(e.into()),
    }
}

/// Decode `count` little-endian `i16` samples.
fn read_cells<R: Read>(source: R, count: usize) -> std::io::Result<Vec<i16>> {
    const CHUNK_CELLS: usize = 64 * 1024;

    let mut reader = BufReader::new(source);
    let mut cells = Vec::with_capacity(count);
    let mut buf = vec![0u8; CHUNK_CELLS * BYTES_PER_CELL as usize];

    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(CHUNK_CELLS);
        let chunk = &mut buf[..n * BYTES_PER_CELL as usize];
        reader.read_exact(chunk)?;
        cells.extend(
            chunk
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
        );
        remaining -= n;
    }

    Ok(cells)
}

/// Generate a deterministic dataset for the geometry.
///
/// A few landmark patches get fixed elevations; every other cell gets a gentle
/// gradient derived from its row and column.
fn synthesize(header: &GridHeader) -> Vec<i16> {
    let width = header.width as usize;
    let mut cells = Vec::with_capacity(header.cell_count());

    for i in 0..header.cell_count() {
        let row = i / width;
        let col = i % width;

        let lat = header.min_lat + row as f64 * header.grid_size;
        let lon = header.min_lon + col as f64 * header.grid_size;

        let landmark = LANDMARKS
            .iter()
            .find(|&&(min_lat, max_lat, min_lon, max_lon, _)| {
                lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon
            });

        let value = match landmark {
            Some(&(.., elevation)) => elevation,
            None => (500.0 + (col as f64 * 0.01 + row as f64 * 0.02)) as i16,
        };
        cells.push(value);
    }

    cells
}
