use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Elevation grid CLI tool
#[derive(Parser)]
#[command(name = "demgrid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Binary grid data file
    #[arg(
        short,
        long,
        env = "DEMGRID_DATA_PATH",
        default_value = "data/elevation.bin",
        global = true
    )]
    data: PathBuf,

    /// Grid header file (defaults to <data>.header)
    #[arg(long, env = "DEMGRID_HEADER_PATH", global = true)]
    header: Option<PathBuf>,

    /// Maximum cached lookup results
    #[arg(
        short,
        long,
        env = "DEMGRID_CACHE_SIZE",
        default_value = "1000000",
        global = true
    )]
    cache_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query elevation for a single coordinate
    Query {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add an elevation column to every row of a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_elevation.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,
    },

    /// Display the grid geometry and the state of its files
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let files = commands::GridFiles::new(cli.data, cli.header);

    match cli.command {
        Commands::Query { lat, lon, json } => {
            commands::query::run(&files, cli.cache_size, lat, lon, json)
        }
        Commands::Batch {
            input,
            output,
            lat_col,
            lon_col,
        } => commands::batch::run(
            &files,
            cli.cache_size,
            input,
            output,
            &lat_col,
            &lon_col,
        ),
        Commands::Info => commands::info::run(&files),
    }
}
