//! Catalogs of candidate artifacts
//!
//! Archive layouts encode timestamps in file and directory names, and Model A
//! keeps a tabular lookup table. Everything that knows those formats lives here so
//! the locators only deal with typed entries.

pub mod archive;
pub mod names;
pub mod simulation;

pub use archive::{
    files_with_extension, scan_run_dirs, scan_snapshot_dirs, PerimeterSnapshotDir,
    SimulationRunDir,
};
pub use names::{
    parse_forecast_timestamp, parse_run_dir_name, parse_run_file_name, parse_snapshot_dir_name,
};
pub use simulation::{SimulationCatalog, SimulationCatalogEntry};
