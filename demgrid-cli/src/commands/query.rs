use anyhow::{Context, Result};
use serde::Serialize;

use super::{format_elevation, GridFiles};

#[derive(Serialize)]
struct ElevationResponse {
    lat: f64,
    lon: f64,
    elevation: f64,
}

pub fn run(files: &GridFiles, cache_size: u64, lat: f64, lon: f64, json: bool) -> Result<()> {
    let service = files.open(cache_size)?;

    let elevation = service
        .get_elevation(lat, lon)
        .context("Failed to get elevation")?;

    if json {
        let response = ElevationResponse {
            lat,
            lon,
            elevation,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{}", format_elevation(elevation));
    }

    Ok(())
}
