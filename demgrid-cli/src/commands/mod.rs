pub mod batch;
pub mod info;
pub mod query;

use anyhow::{Context, Result};
use demgrid::{service::default_header_path, DataSource, ElevationService, ElevationServiceBuilder};
use std::path::PathBuf;

/// Data and header file locations shared by every command.
pub struct GridFiles {
    pub data: PathBuf,
    pub header: PathBuf,
}

impl GridFiles {
    pub fn new(data: PathBuf, header: Option<PathBuf>) -> Self {
        let header = header.unwrap_or_else(|| default_header_path(&data));
        Self { data, header }
    }

    /// Load the grid into an [`ElevationService`].
    pub fn open(&self, cache_size: u64) -> Result<ElevationService> {
        let service = ElevationServiceBuilder::new(&self.data, &self.header)
            .cache_capacity(cache_size)
            .build()
            .with_context(|| format!("Failed to load grid from {}", self.data.display()))?;

        if service.grid().source() != DataSource::File {
            eprintln!(
                "warning: {} not usable, answering from synthetic data",
                self.data.display()
            );
        }

        Ok(service)
    }
}

/// Render an elevation the way the commands print it.
pub fn format_elevation(elevation: f64) -> String {
    if elevation == f64::from(demgrid::NO_DATA) {
        "void".to_string()
    } else {
        format!("{:.2}", elevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_defaults_next_to_data() {
        let files = GridFiles::new(PathBuf::from("data/elevation.bin"), None);
        assert_eq!(files.header, PathBuf::from("data/elevation.bin.header"));

        let files = GridFiles::new(
            PathBuf::from("grid.bin"),
            Some(PathBuf::from("other.header")),
        );
        assert_eq!(files.header, PathBuf::from("other.header"));
    }

    #[test]
    fn test_format_elevation() {
        assert_eq!(format_elevation(327.67), "327.67");
        assert_eq!(format_elevation(5.0), "5.00");
        assert_eq!(format_elevation(-9999.0), "void");
    }
}
