use anyhow::{Context, Result};
use demgrid::GridHeader;
use std::path::Path;

use super::GridFiles;

pub fn run(files: &GridFiles) -> Result<()> {
    let header = GridHeader::read_from(&files.header)
        .with_context(|| format!("Failed to read header {}", files.header.display()))?;

    let (header, header_state) = match header {
        Some(header) => (header, "present".to_string()),
        None => (GridHeader::default(), "missing, using defaults".to_string()),
    };

    println!("Header: {} ({})", files.header.display(), header_state);
    println!("Data: {} ({})", files.data.display(), data_state(&files.data, &header)?);
    println!();
    println!(
        "Grid: {}x{} cells at {}°",
        header.width, header.height, header.grid_size
    );
    println!(
        "Coverage: lat {} to {}, lon {} to {}",
        header.min_lat, header.max_lat, header.min_lon, header.max_lon
    );
    println!("Cells: {}", header.cell_count());
    println!("Expected data size: {}", format_size(header.data_size_bytes()));

    Ok(())
}

/// Describe the data file relative to the size the header expects.
fn data_state(path: &Path, header: &GridHeader) -> Result<String> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok("missing, lookups use synthetic data".to_string());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
        }
    };

    let expected = header.data_size_bytes();
    Ok(if metadata.len() == expected {
        format!("{}, matches header", format_size(metadata.len()))
    } else {
        format!(
            "{}, header expects {} bytes",
            format_size(metadata.len()),
            expected
        )
    })
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
