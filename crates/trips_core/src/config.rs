//! Export parameters: file paths, time-of-day window, optional vehicle
//! sampling.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Default time window: 07:00 to 07:15, in seconds since midnight.
pub const DEFAULT_WINDOW_START_SECS: f64 = 7.0 * 3600.0;
pub const DEFAULT_WINDOW_END_SECS: f64 = 7.25 * 3600.0;

/// Parameters for one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportParams {
    /// Input FCD Parquet file.
    pub input: PathBuf,
    /// Output path for the gzipped Feather file.
    pub output: PathBuf,
    /// Rows are kept when `window_start_secs < t < window_end_secs`
    /// (both bounds strict).
    pub window_start_secs: f64,
    pub window_end_secs: f64,
    /// Export at most this many vehicles, chosen at random (None = all).
    pub sample_vehicles: Option<usize>,
    /// Random seed for vehicle sampling (optional; if None, uses entropy).
    pub seed: Option<u64>,
}

impl ExportParams {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            window_start_secs: DEFAULT_WINDOW_START_SECS,
            window_end_secs: DEFAULT_WINDOW_END_SECS,
            sample_vehicles: None,
            seed: None,
        }
    }

    /// Set the time window in seconds since midnight.
    pub fn with_window_secs(mut self, start: f64, end: f64) -> Self {
        self.window_start_secs = start;
        self.window_end_secs = end;
        self
    }

    /// Set the time window in hours since midnight.
    pub fn with_window_hours(mut self, start: f64, end: f64) -> Self {
        self.window_start_secs = start * 3600.0;
        self.window_end_secs = end * 3600.0;
        self
    }

    /// Export at most `count` vehicles, drawn uniformly without replacement.
    pub fn with_sample_vehicles(mut self, count: usize) -> Self {
        self.sample_vehicles = Some(count);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fail fast on configuration errors, before the input is touched.
    pub fn validate(&self) -> Result<(), ExportError> {
        if !self.window_start_secs.is_finite() || !self.window_end_secs.is_finite() {
            return Err(ExportError::InvalidParams(
                "time window bounds must be finite".to_string(),
            ));
        }
        if self.window_start_secs >= self.window_end_secs {
            return Err(ExportError::InvalidParams(format!(
                "time window start ({}) must be before end ({})",
                self.window_start_secs, self.window_end_secs
            )));
        }
        if self.sample_vehicles == Some(0) {
            return Err(ExportError::InvalidParams(
                "sample vehicle count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ExportParams {
        ExportParams::new("in.parquet", "out.feather.gz")
    }

    #[test]
    fn defaults_cover_the_morning_quarter_hour() {
        let params = params();
        assert_eq!(params.window_start_secs, 25200.0);
        assert_eq!(params.window_end_secs, 26100.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let params = params().with_window_secs(26100.0, 25200.0);
        assert!(matches!(
            params.validate(),
            Err(ExportError::InvalidParams(_))
        ));
    }

    #[test]
    fn equal_window_bounds_are_rejected() {
        // Both bounds are strict, so an equal window can never keep a row.
        let params = params().with_window_secs(25200.0, 25200.0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn non_finite_window_is_rejected() {
        let params = params().with_window_secs(0.0, f64::INFINITY);
        assert!(params.validate().is_err());
    }

    #[test]
    fn zero_sample_count_is_rejected() {
        let params = params().with_sample_vehicles(0);
        assert!(matches!(
            params.validate(),
            Err(ExportError::InvalidParams(_))
        ));
    }
}
