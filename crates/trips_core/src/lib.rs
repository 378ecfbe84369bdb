//! Convert floating-car-data (FCD) trajectories from a traffic
//! microsimulation into the gzipped Feather trips format consumed by the
//! map animation layer.

pub mod config;
pub mod error;
pub mod export;
pub mod fcd;
pub mod runner;
pub mod trips;
