#![forbid(unsafe_code)]

//! Headless driver for the heatfield engine.
//!
//! - [`scenario`]: deterministic synthetic inputs (walkers, masks, video)
//! - [`golden`]: raster checksums, golden files and JSONL records
//! - [`snapshot`]: PNG / PPM export of rendered rasters
//! - [`cli`]: argument parsing for the `heatfield-harness` binary

pub mod cli;
pub mod golden;
pub mod logging;
pub mod scenario;
pub mod snapshot;

pub use golden::{GoldenOutcome, compute_raster_checksum, verify_checksums};
pub use scenario::{Scenario, ScenarioRun, ScenarioSource, run_scenario};
