//! FCD Parquet input: schema checks, one-time optional-column detection,
//! and the strict time-window filter.
//!
//! The simulator writes one row per vehicle per timestep. Column types vary
//! between tool versions (ids may be integers, numerics may be f32 or f64),
//! so every column is cast once per batch to a canonical type before rows
//! are collected.

use std::fs::File;
use std::path::Path;

use arrow::array::AsArray;
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::ExportError;

pub const COL_VEHICLE_ID: &str = "vehicle_id";
pub const COL_TIME: &str = "timestep_time";
pub const COL_X: &str = "vehicle_x";
pub const COL_Y: &str = "vehicle_y";
pub const COL_SPEED: &str = "vehicle_speed";
pub const COL_EDGE: &str = "vehicle_edge";
pub const COL_POS: &str = "vehicle_pos";
pub const COL_SPEED_RELATIVE: &str = "vehicle_speedRelative";
pub const COL_ANGLE: &str = "vehicle_angle";

/// Position samples inside the time window, column-major.
///
/// Optional columns are `Some` only when present in the input schema; the
/// decision is made once against the schema, never per row.
#[derive(Debug, Default)]
pub struct FcdColumns {
    pub vehicle_ids: Vec<String>,
    pub times: Vec<f64>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub speeds: Option<Vec<f64>>,
    pub edges: Option<Vec<String>>,
    pub positions: Option<Vec<f64>>,
    pub relative_speeds: Option<Vec<f64>>,
    pub angles: Option<Vec<f64>>,
}

impl FcdColumns {
    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

struct RequiredColumns {
    vehicle_id: usize,
    time: usize,
    x: usize,
    y: usize,
}

struct OptionalColumns {
    speed: Option<usize>,
    edge: Option<usize>,
    pos: Option<usize>,
    relative_speed: Option<usize>,
    angle: Option<usize>,
}

/// Read the FCD Parquet file, keeping rows with
/// `window_start_secs < timestep_time < window_end_secs`.
pub fn read_fcd_parquet(
    path: &Path,
    window_start_secs: f64,
    window_end_secs: f64,
) -> Result<FcdColumns, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();

    let required = required_indices(&schema)?;
    let optional = optional_indices(&schema);

    let mut columns = FcdColumns {
        speeds: optional.speed.map(|_| Vec::new()),
        edges: optional.edge.map(|_| Vec::new()),
        positions: optional.pos.map(|_| Vec::new()),
        relative_speeds: optional.relative_speed.map(|_| Vec::new()),
        angles: optional.angle.map(|_| Vec::new()),
        ..FcdColumns::default()
    };

    for batch in builder.build()? {
        let batch = batch?;
        append_batch(
            &mut columns,
            &batch,
            &required,
            &optional,
            window_start_secs,
            window_end_secs,
        )?;
    }

    Ok(columns)
}

fn required_indices(schema: &Schema) -> Result<RequiredColumns, ExportError> {
    Ok(RequiredColumns {
        vehicle_id: require(schema, COL_VEHICLE_ID)?,
        time: require(schema, COL_TIME)?,
        x: require(schema, COL_X)?,
        y: require(schema, COL_Y)?,
    })
}

fn optional_indices(schema: &Schema) -> OptionalColumns {
    OptionalColumns {
        speed: schema.index_of(COL_SPEED).ok(),
        edge: schema.index_of(COL_EDGE).ok(),
        pos: schema.index_of(COL_POS).ok(),
        relative_speed: schema.index_of(COL_SPEED_RELATIVE).ok(),
        angle: schema.index_of(COL_ANGLE).ok(),
    }
}

fn require(schema: &Schema, name: &'static str) -> Result<usize, ExportError> {
    schema
        .index_of(name)
        .map_err(|_| ExportError::MissingColumn(name))
}

fn append_batch(
    columns: &mut FcdColumns,
    batch: &RecordBatch,
    required: &RequiredColumns,
    optional: &OptionalColumns,
    window_start_secs: f64,
    window_end_secs: f64,
) -> Result<(), ExportError> {
    let ids = cast(batch.column(required.vehicle_id), &DataType::Utf8)?;
    let ids = ids.as_string::<i32>();
    let times = cast(batch.column(required.time), &DataType::Float64)?;
    let times = times.as_primitive::<Float64Type>();
    let xs = cast(batch.column(required.x), &DataType::Float64)?;
    let xs = xs.as_primitive::<Float64Type>();
    let ys = cast(batch.column(required.y), &DataType::Float64)?;
    let ys = ys.as_primitive::<Float64Type>();

    let speeds = float_column(batch, optional.speed)?;
    let speeds = speeds.as_ref().map(|a| a.as_primitive::<Float64Type>());
    let positions = float_column(batch, optional.pos)?;
    let positions = positions.as_ref().map(|a| a.as_primitive::<Float64Type>());
    let relative_speeds = float_column(batch, optional.relative_speed)?;
    let relative_speeds = relative_speeds
        .as_ref()
        .map(|a| a.as_primitive::<Float64Type>());
    let angles = float_column(batch, optional.angle)?;
    let angles = angles.as_ref().map(|a| a.as_primitive::<Float64Type>());
    let edges = match optional.edge {
        Some(idx) => Some(cast(batch.column(idx), &DataType::Utf8)?),
        None => None,
    };
    let edges = edges.as_ref().map(|a| a.as_string::<i32>());

    for row in 0..batch.num_rows() {
        let t = times.value(row);
        if !(t > window_start_secs && t < window_end_secs) {
            continue;
        }
        columns.vehicle_ids.push(ids.value(row).to_string());
        columns.times.push(t);
        columns.xs.push(xs.value(row));
        columns.ys.push(ys.value(row));
        if let (Some(dst), Some(src)) = (columns.speeds.as_mut(), speeds) {
            dst.push(src.value(row));
        }
        if let (Some(dst), Some(src)) = (columns.edges.as_mut(), edges) {
            dst.push(src.value(row).to_string());
        }
        if let (Some(dst), Some(src)) = (columns.positions.as_mut(), positions) {
            dst.push(src.value(row));
        }
        if let (Some(dst), Some(src)) = (columns.relative_speeds.as_mut(), relative_speeds) {
            dst.push(src.value(row));
        }
        if let (Some(dst), Some(src)) = (columns.angles.as_mut(), angles) {
            dst.push(src.value(row));
        }
    }

    Ok(())
}

fn float_column(
    batch: &RecordBatch,
    index: Option<usize>,
) -> Result<Option<arrow::array::ArrayRef>, ExportError> {
    match index {
        Some(idx) => Ok(Some(cast(batch.column(idx), &DataType::Float64)?)),
        None => Ok(None),
    }
}
