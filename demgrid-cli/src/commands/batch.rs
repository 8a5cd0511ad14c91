use anyhow::{Context, Result};
use demgrid::{BatchPoint, ElevationService};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::{format_elevation, GridFiles};

/// Rows resolved per service batch call.
const CHUNK_SIZE: usize = 1000;

pub fn run(
    files: &GridFiles,
    cache_size: u64,
    input: PathBuf,
    output: Option<PathBuf>,
    lat_col: &str,
    lon_col: &str,
) -> Result<()> {
    let service = files.open(cache_size)?;

    let output_path = output.unwrap_or_else(|| default_output_path(&input));

    let file = File::open(&input).context("Failed to open input file")?;
    let output_file = File::create(&output_path).context("Failed to create output file")?;

    let rows = process_csv(
        &service,
        BufReader::new(file),
        BufWriter::new(output_file),
        lat_col,
        lon_col,
    )?;

    println!(
        "Output written to: {} ({} rows)",
        output_path.display(),
        rows
    );
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_elevation.csv", stem))
}

/// Copy CSV rows from `reader` to `writer`, appending an `elevation` column.
///
/// Returns the number of data rows written.
fn process_csv<R: Read, W: Write>(
    service: &ElevationService,
    reader: R,
    writer: W,
    lat_col: &str,
    lon_col: &str,
) -> Result<usize> {
    let mut reader = csv::Reader::from_reader(reader);

    // Find column indices
    let headers = reader.headers()?.clone();
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;

    // Collect records for progress bar
    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut writer = csv::Writer::from_writer(writer);

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.push("elevation");
    writer.write_record(&new_headers)?;

    for (chunk_no, chunk) in records.chunks(CHUNK_SIZE).enumerate() {
        let points = chunk
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let line = chunk_no * CHUNK_SIZE + i + 2;
                Ok(BatchPoint {
                    lat: parse_coordinate(record, lat_idx, "latitude", line)?,
                    lon: parse_coordinate(record, lon_idx, "longitude", line)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for (record, result) in chunk.iter().zip(service.get_batch(&points)) {
            let elevation = format_elevation(result.elevation);
            let mut new_record: Vec<&str> = record.iter().collect();
            new_record.push(&elevation);
            writer.write_record(&new_record)?;
        }

        pb.inc(chunk.len() as u64);
    }

    pb.finish_with_message("done");
    writer.flush()?;

    Ok(records.len())
}

fn parse_coordinate(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<f64> {
    record
        .get(idx)
        .with_context(|| format!("Missing {} on line {}", name, line))?
        .trim()
        .parse()
        .with_context(|| format!("Invalid {} on line {}", name, line))
}
