//! Trip building: stable sort by (vehicle, time), optional seeded vehicle
//! subsampling, and a two-pass flatten into offset-indexed flat buffers.
//!
//! Pass 1 computes group boundaries over the sorted rows; pass 2 fills
//! pre-sized buffers group by group. The offsets array partitions every
//! flat buffer identically: trip `i` spans `offsets[i]..offsets[i + 1]`.

use std::cmp::Ordering;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::fcd::FcdColumns;

/// Attribute defaults applied when the matching input column is absent.
/// A column is either present for the whole run or defaulted for the whole
/// run; there is no per-row fallback.
pub const DEFAULT_SPEED: f32 = 0.0;
pub const DEFAULT_EDGE: &str = "";
pub const DEFAULT_POSITION: f32 = 0.0;
pub const DEFAULT_RELATIVE_SPEED: f32 = 1.0;
pub const DEFAULT_ANGLE: f32 = 0.0;

/// One row per vehicle, with seven flat attribute buffers partitioned by
/// `offsets`. Coordinates are interleaved x,y pairs, so `coords` holds
/// twice as many values as the other buffers.
#[derive(Debug, Clone)]
pub struct TripTable {
    pub vehicle_ids: Vec<String>,
    pub offsets: Vec<i32>,
    pub coords: Vec<f32>,
    pub timestamps: Vec<f32>,
    pub speeds: Vec<f32>,
    pub edges: Vec<String>,
    pub positions: Vec<f32>,
    pub relative_speeds: Vec<f32>,
    pub angles: Vec<f32>,
}

impl TripTable {
    pub fn num_trips(&self) -> usize {
        self.vehicle_ids.len()
    }

    pub fn num_samples(&self) -> usize {
        self.timestamps.len()
    }

    /// Min and max timestamp across all trips (seconds since midnight),
    /// or None when the table is empty.
    pub fn timestamp_range(&self) -> Option<(f32, f32)> {
        let first = *self.timestamps.first()?;
        let range = self
            .timestamps
            .iter()
            .fold((first, first), |(min, max), &t| (min.min(t), max.max(t)));
        Some(range)
    }
}

/// Group the filtered samples into one trip per vehicle.
///
/// Rows are stable-sorted by (vehicle id, timestamp); when `sample_vehicles`
/// is below the distinct vehicle count, that many vehicles are drawn
/// uniformly without replacement and the rest are dropped whole. Group
/// order is sorted vehicle-id order, deterministic for a given seed.
pub fn build_trips(
    columns: &FcdColumns,
    sample_vehicles: Option<usize>,
    seed: Option<u64>,
) -> TripTable {
    let mut order: Vec<usize> = (0..columns.len()).collect();
    order.sort_by(|&a, &b| {
        columns.vehicle_ids[a]
            .cmp(&columns.vehicle_ids[b])
            .then_with(|| {
                columns.times[a]
                    .partial_cmp(&columns.times[b])
                    .unwrap_or(Ordering::Equal)
            })
    });

    if let Some(target) = sample_vehicles {
        order = sample_order(columns, order, target, seed);
    }

    // Pass 1: group boundaries over the sorted row order.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    for i in 1..=order.len() {
        let boundary = i == order.len()
            || columns.vehicle_ids[order[i]] != columns.vehicle_ids[order[i - 1]];
        if boundary {
            groups.push((start, i));
            start = i;
        }
    }

    // Pass 2: fill pre-sized buffers.
    let total = order.len();
    let mut table = TripTable {
        vehicle_ids: Vec::with_capacity(groups.len()),
        offsets: Vec::with_capacity(groups.len() + 1),
        coords: Vec::with_capacity(total * 2),
        timestamps: Vec::with_capacity(total),
        speeds: Vec::with_capacity(total),
        edges: Vec::with_capacity(total),
        positions: Vec::with_capacity(total),
        relative_speeds: Vec::with_capacity(total),
        angles: Vec::with_capacity(total),
    };
    table.offsets.push(0);

    for (group_index, &(group_start, group_end)) in groups.iter().enumerate() {
        for &row in &order[group_start..group_end] {
            table.coords.push(columns.xs[row] as f32);
            table.coords.push(columns.ys[row] as f32);
            table.timestamps.push(columns.times[row] as f32);
            table.speeds.push(match &columns.speeds {
                Some(values) => values[row] as f32,
                None => DEFAULT_SPEED,
            });
            table.edges.push(match &columns.edges {
                Some(values) => values[row].clone(),
                None => DEFAULT_EDGE.to_string(),
            });
            table.positions.push(match &columns.positions {
                Some(values) => values[row] as f32,
                None => DEFAULT_POSITION,
            });
            table.relative_speeds.push(match &columns.relative_speeds {
                Some(values) => values[row] as f32,
                None => DEFAULT_RELATIVE_SPEED,
            });
            table.angles.push(match &columns.angles {
                Some(values) => values[row] as f32,
                None => DEFAULT_ANGLE,
            });
        }
        table
            .vehicle_ids
            .push(columns.vehicle_ids[order[group_start]].clone());
        table.offsets.push(table.timestamps.len() as i32);

        if (group_index + 1) % 1000 == 0 {
            log::debug!("flattened {}/{} vehicles", group_index + 1, groups.len());
        }
    }

    table
}

/// Distinct vehicle count before sampling, for reporting.
pub fn count_distinct_vehicles(columns: &FcdColumns) -> usize {
    columns
        .vehicle_ids
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>()
        .len()
}

/// Keep only rows belonging to `target` randomly chosen vehicles.
/// `order` must already be sorted by vehicle id.
fn sample_order(
    columns: &FcdColumns,
    order: Vec<usize>,
    target: usize,
    seed: Option<u64>,
) -> Vec<usize> {
    let mut distinct: Vec<&str> = Vec::new();
    for &row in &order {
        let id = columns.vehicle_ids[row].as_str();
        if distinct.last() != Some(&id) {
            distinct.push(id);
        }
    }
    if target >= distinct.len() {
        return order;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let keep: HashSet<&str> = distinct
        .choose_multiple(&mut rng, target)
        .copied()
        .collect();

    order
        .into_iter()
        .filter(|&row| keep.contains(columns.vehicle_ids[row].as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three vehicles with 2, 3, and 1 samples, deliberately interleaved.
    fn three_vehicle_columns() -> FcdColumns {
        FcdColumns {
            vehicle_ids: ["b", "a", "c", "b", "a", "b"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            times: vec![25300.0, 25260.0, 25400.0, 25320.0, 25210.0, 25310.0],
            xs: vec![10.0, 1.0, 20.0, 11.0, 0.0, 10.5],
            ys: vec![110.0, 101.0, 120.0, 111.0, 100.0, 110.5],
            speeds: Some(vec![5.0, 1.0, 9.0, 6.0, 0.5, 5.5]),
            edges: Some(
                ["e5", "e1", "e9", "e6", "e0", "e5"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            positions: Some(vec![50.0, 10.0, 90.0, 60.0, 5.0, 55.0]),
            relative_speeds: Some(vec![0.5, 0.1, 0.9, 0.6, 0.05, 0.55]),
            angles: Some(vec![90.0, 0.0, 180.0, 90.0, 0.0, 90.0]),
        }
    }

    fn columns_with_vehicles(counts: &[(&str, usize)]) -> FcdColumns {
        let mut columns = FcdColumns::default();
        for &(vehicle, count) in counts {
            for i in 0..count {
                columns.vehicle_ids.push(vehicle.to_string());
                columns.times.push(25201.0 + i as f64);
                columns.xs.push(i as f64);
                columns.ys.push(i as f64);
            }
        }
        columns
    }

    #[test]
    fn offsets_partition_trips_in_vehicle_order() {
        let table = build_trips(&three_vehicle_columns(), None, None);

        assert_eq!(table.vehicle_ids, vec!["a", "b", "c"]);
        assert_eq!(table.offsets, vec![0, 2, 5, 6]);
        assert_eq!(table.num_trips(), 3);
        assert_eq!(table.num_samples(), 6);
        assert_eq!(table.coords.len(), 12);
    }

    #[test]
    fn samples_within_a_trip_are_time_ordered_and_aligned() {
        let table = build_trips(&three_vehicle_columns(), None, None);

        for trip in 0..table.num_trips() {
            let range = table.offsets[trip] as usize..table.offsets[trip + 1] as usize;
            let times = &table.timestamps[range.clone()];
            assert!(times.windows(2).all(|w| w[0] <= w[1]));
            // Index i of every buffer refers to the same source sample.
            for i in range {
                assert_eq!(table.speeds[i], table.positions[i] / 10.0);
            }
        }

        // Vehicle "a" sorts first: its earliest sample leads the buffers.
        assert_eq!(table.timestamps[0], 25210.0);
        assert_eq!(table.coords[0], 0.0);
        assert_eq!(table.coords[1], 100.0);
        assert_eq!(table.edges[0], "e0");
    }

    #[test]
    fn absent_optional_columns_are_defaulted() {
        let mut columns = three_vehicle_columns();
        columns.speeds = None;
        columns.edges = None;
        columns.positions = None;
        columns.relative_speeds = None;
        columns.angles = None;

        let table = build_trips(&columns, None, None);

        assert_eq!(table.num_samples(), 6);
        assert!(table.speeds.iter().all(|&v| v == DEFAULT_SPEED));
        assert!(table.edges.iter().all(|e| e == DEFAULT_EDGE));
        assert!(table.positions.iter().all(|&v| v == DEFAULT_POSITION));
        assert!(table
            .relative_speeds
            .iter()
            .all(|&v| v == DEFAULT_RELATIVE_SPEED));
        assert!(table.angles.iter().all(|&v| v == DEFAULT_ANGLE));
    }

    #[test]
    fn empty_input_produces_zero_trips() {
        let table = build_trips(&FcdColumns::default(), None, None);

        assert_eq!(table.num_trips(), 0);
        assert_eq!(table.offsets, vec![0]);
        assert!(table.timestamps.is_empty());
        assert_eq!(table.timestamp_range(), None);
    }

    #[test]
    fn sampling_keeps_whole_vehicles() {
        let columns = columns_with_vehicles(&[("v1", 4), ("v2", 2), ("v3", 7), ("v4", 1), ("v5", 3)]);
        let table = build_trips(&columns, Some(2), Some(42));

        assert_eq!(table.num_trips(), 2);
        for trip in 0..table.num_trips() {
            let len = (table.offsets[trip + 1] - table.offsets[trip]) as usize;
            let vehicle = table.vehicle_ids[trip].as_str();
            let expected = columns
                .vehicle_ids
                .iter()
                .filter(|id| id.as_str() == vehicle)
                .count();
            assert_eq!(len, expected, "vehicle {vehicle} was truncated");
        }
        assert_eq!(
            table.num_samples(),
            table
                .vehicle_ids
                .iter()
                .map(|v| columns.vehicle_ids.iter().filter(|id| *id == v).count())
                .sum::<usize>()
        );
    }

    #[test]
    fn sampling_is_reproducible_for_a_seed() {
        let columns = columns_with_vehicles(&[("v1", 1), ("v2", 1), ("v3", 1), ("v4", 1), ("v5", 1)]);

        let first = build_trips(&columns, Some(3), Some(7));
        let second = build_trips(&columns, Some(3), Some(7));

        assert_eq!(first.vehicle_ids, second.vehicle_ids);
        assert_eq!(first.offsets, second.offsets);
    }

    #[test]
    fn sample_target_at_or_above_distinct_count_keeps_all() {
        let columns = columns_with_vehicles(&[("v1", 2), ("v2", 2), ("v3", 2)]);

        let table = build_trips(&columns, Some(3), Some(1));
        assert_eq!(table.num_trips(), 3);

        let table = build_trips(&columns, Some(100), Some(1));
        assert_eq!(table.num_trips(), 3);
        assert_eq!(table.num_samples(), 6);
    }

    #[test]
    fn distinct_vehicle_count_ignores_row_multiplicity() {
        let columns = columns_with_vehicles(&[("v1", 5), ("v2", 1)]);
        assert_eq!(count_distinct_vehicles(&columns), 2);
    }

    #[test]
    fn timestamp_range_spans_all_trips() {
        let table = build_trips(&three_vehicle_columns(), None, None);
        assert_eq!(table.timestamp_range(), Some((25210.0, 25400.0)));
    }
}
