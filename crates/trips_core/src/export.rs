//! Feather output: nested list columns over a shared offsets buffer,
//! IPC-serialized into memory, then gzipped for transport.
//!
//! Column names, order, and nesting are the contract with the map
//! animation layer; any deviation breaks that consumer.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, ListArray, StringArray,
};
use arrow::buffer::{OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::ExportError;
use crate::trips::TripTable;

/// Size and range statistics for one finished export.
#[derive(Debug, Clone)]
pub struct ExportStats {
    pub num_trips: usize,
    pub num_samples: usize,
    /// Min/max timestamp across all trips (seconds since midnight).
    pub timestamp_range: Option<(f32, f32)>,
    pub uncompressed_bytes: usize,
    pub compressed_bytes: u64,
}

impl ExportStats {
    /// Transport saving as a percentage of the uncompressed size.
    pub fn compression_ratio(&self) -> f64 {
        if self.uncompressed_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_bytes as f64 / self.uncompressed_bytes as f64) * 100.0
    }
}

/// Serialize the trip table to uncompressed Feather (Arrow IPC file
/// format) in memory, gzip it at maximum level, and write it to `path`.
pub fn write_trips_feather_gz(path: &Path, trips: &TripTable) -> Result<ExportStats, ExportError> {
    let batch = build_record_batch(trips)?;
    let buffer = serialize_feather(&batch)?;

    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::best());
    encoder.write_all(&buffer)?;
    let file = encoder.finish()?;
    let compressed_bytes = file.metadata()?.len();

    Ok(ExportStats {
        num_trips: trips.num_trips(),
        num_samples: trips.num_samples(),
        timestamp_range: trips.timestamp_range(),
        uncompressed_bytes: buffer.len(),
        compressed_bytes,
    })
}

fn serialize_feather(batch: &RecordBatch) -> Result<Vec<u8>, ArrowError> {
    let mut buffer = Vec::new();
    {
        let mut writer = FileWriter::try_new(&mut buffer, batch.schema_ref())?;
        writer.write(batch)?;
        writer.finish()?;
    }
    Ok(buffer)
}

fn build_record_batch(trips: &TripTable) -> Result<RecordBatch, ArrowError> {
    let offsets = OffsetBuffer::new(ScalarBuffer::from(trips.offsets.clone()));

    let geometry = coordinate_pair_list(&trips.coords, &offsets)?;
    let timestamps = float_list(&trips.timestamps, &offsets)?;
    let speeds = float_list(&trips.speeds, &offsets)?;
    let edges = string_list(&trips.edges, &offsets)?;
    let positions = float_list(&trips.positions, &offsets)?;
    let relative_speeds = float_list(&trips.relative_speeds, &offsets)?;
    let angles = float_list(&trips.angles, &offsets)?;
    let vehicle_ids = StringArray::from(trips.vehicle_ids.clone());

    let schema = Schema::new(vec![
        Field::new("geometry", geometry.data_type().clone(), false),
        Field::new("timestamps", timestamps.data_type().clone(), false),
        Field::new("speeds", speeds.data_type().clone(), false),
        Field::new("edges", edges.data_type().clone(), false),
        Field::new("positions", positions.data_type().clone(), false),
        Field::new("relative_speeds", relative_speeds.data_type().clone(), false),
        Field::new("angles", angles.data_type().clone(), false),
        Field::new("vehicle_id", DataType::Utf8, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(geometry),
        Arc::new(timestamps),
        Arc::new(speeds),
        Arc::new(edges),
        Arc::new(positions),
        Arc::new(relative_speeds),
        Arc::new(angles),
        Arc::new(vehicle_ids),
    ];

    RecordBatch::try_new(Arc::new(schema), arrays)
}

/// `List<FixedSizeList<Float32, 2>>`: interleaved x,y values grouped into
/// pairs, then partitioned per trip by the shared offsets.
fn coordinate_pair_list(
    coords: &[f32],
    offsets: &OffsetBuffer<i32>,
) -> Result<ListArray, ArrowError> {
    let item = Arc::new(Field::new("item", DataType::Float32, true));
    let values = Float32Array::from(coords.to_vec());
    let pairs = FixedSizeListArray::try_new(item, 2, Arc::new(values), None)?;
    let pair_item = Arc::new(Field::new("item", pairs.data_type().clone(), true));
    ListArray::try_new(pair_item, offsets.clone(), Arc::new(pairs), None)
}

fn float_list(values: &[f32], offsets: &OffsetBuffer<i32>) -> Result<ListArray, ArrowError> {
    let item = Arc::new(Field::new("item", DataType::Float32, true));
    let values = Float32Array::from(values.to_vec());
    ListArray::try_new(item, offsets.clone(), Arc::new(values), None)
}

fn string_list(values: &[String], offsets: &OffsetBuffer<i32>) -> Result<ListArray, ArrowError> {
    let item = Arc::new(Field::new("item", DataType::Utf8, true));
    let values = StringArray::from(values.to_vec());
    ListArray::try_new(item, offsets.clone(), Arc::new(values), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_table() -> TripTable {
        TripTable {
            vehicle_ids: Vec::new(),
            offsets: vec![0],
            coords: Vec::new(),
            timestamps: Vec::new(),
            speeds: Vec::new(),
            edges: Vec::new(),
            positions: Vec::new(),
            relative_speeds: Vec::new(),
            angles: Vec::new(),
        }
    }

    #[test]
    fn empty_table_builds_a_zero_row_batch() {
        let batch = build_record_batch(&empty_table()).expect("batch should build");
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 8);
    }

    #[test]
    fn column_order_matches_consumer_contract() {
        let batch = build_record_batch(&empty_table()).expect("batch should build");
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "geometry",
                "timestamps",
                "speeds",
                "edges",
                "positions",
                "relative_speeds",
                "angles",
                "vehicle_id",
            ]
        );
    }

    #[test]
    fn compression_ratio_guards_empty_output() {
        let stats = ExportStats {
            num_trips: 0,
            num_samples: 0,
            timestamp_range: None,
            uncompressed_bytes: 0,
            compressed_bytes: 0,
        };
        assert_eq!(stats.compression_ratio(), 0.0);

        let stats = ExportStats {
            num_trips: 1,
            num_samples: 2,
            timestamp_range: Some((25201.0, 25202.0)),
            uncompressed_bytes: 1000,
            compressed_bytes: 250,
        };
        assert!((stats.compression_ratio() - 75.0).abs() < 1e-9);
    }
}
