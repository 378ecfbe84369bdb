//! Pipeline orchestration: validate, read, build, write.

use crate::config::ExportParams;
use crate::error::ExportError;
use crate::export::{write_trips_feather_gz, ExportStats};
use crate::fcd::read_fcd_parquet;
use crate::trips::{build_trips, count_distinct_vehicles};

/// Run the full conversion described by `params`.
///
/// Reads the FCD Parquet input, builds one trip per vehicle, writes the
/// gzipped Feather output, and returns the run's statistics. An empty
/// filtered result is not an error; it produces a valid zero-trip file.
pub fn run_export(params: &ExportParams) -> Result<ExportStats, ExportError> {
    params.validate()?;

    log::info!("reading FCD input from {}", params.input.display());
    let columns = read_fcd_parquet(
        &params.input,
        params.window_start_secs,
        params.window_end_secs,
    )?;
    let source_vehicles = count_distinct_vehicles(&columns);
    log::info!(
        "{} positions across {} vehicles inside the {}s..{}s window",
        columns.len(),
        source_vehicles,
        params.window_start_secs,
        params.window_end_secs
    );

    let trips = build_trips(&columns, params.sample_vehicles, params.seed);
    if trips.num_trips() < source_vehicles {
        log::info!("sampled {} of {} vehicles", trips.num_trips(), source_vehicles);
    }

    log::info!(
        "writing {} trips ({} positions) to {}",
        trips.num_trips(),
        trips.num_samples(),
        params.output.display()
    );
    write_trips_feather_gz(&params.output, &trips)
}
