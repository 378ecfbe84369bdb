//! Command-line front end for the FCD → trips converter.
//!
//! Run with: cargo run -p trips_cli -- fcd_out.parquet trips.feather.gz

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use trips_core::config::ExportParams;
use trips_core::runner::run_export;

#[derive(Parser)]
#[command(name = "fcd2trips")]
#[command(about = "Convert FCD Parquet output to a gzipped Feather trips file")]
struct Cli {
    /// Input FCD Parquet file
    input: PathBuf,
    /// Output .feather.gz path
    output: PathBuf,
    /// Keep rows after this time of day (hours, exclusive)
    #[arg(long, default_value_t = 7.0)]
    window_start_hours: f64,
    /// Keep rows before this time of day (hours, exclusive)
    #[arg(long, default_value_t = 7.25)]
    window_end_hours: f64,
    /// Export at most this many vehicles, chosen at random
    #[arg(long)]
    sample_vehicles: Option<usize>,
    /// Seed for vehicle sampling (omit for a different selection each run)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut params = ExportParams::new(cli.input, cli.output)
        .with_window_hours(cli.window_start_hours, cli.window_end_hours);
    if let Some(count) = cli.sample_vehicles {
        params = params.with_sample_vehicles(count);
    }
    if let Some(seed) = cli.seed {
        params = params.with_seed(seed);
    }

    let output = params.output.clone();
    match run_export(&params) {
        Ok(stats) => {
            println!("Done!");
            if let Some((min, max)) = stats.timestamp_range {
                println!(
                    "Timestamp range: {} ({:.2} hours) to {} ({:.2} hours)",
                    min,
                    min / 3600.0,
                    max,
                    max / 3600.0
                );
            }
            println!("Number of trips: {}", stats.num_trips);
            println!("Total positions: {}", stats.num_samples);
            println!(
                "Original size: {:.1} KB",
                stats.uncompressed_bytes as f64 / 1024.0
            );
            println!(
                "Compressed size: {:.1} KB",
                stats.compressed_bytes as f64 / 1024.0
            );
            println!("Compression ratio: {:.1}%", stats.compression_ratio());
            println!("Output file: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Export failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
