#![forbid(unsafe_code)]

//! Field renderer abstraction.
//!
//! A [`FieldRenderer`] owns its accumulation buffers and turns samples into
//! a colored raster. The two implementations solve the same problem at
//! different sample densities: sparse keypoints on a coarse grid drawn as
//! metaballs, or dense per-pixel motion blurred and upsampled.

pub mod renderers;

use heatfield_core::{EngineConfig, SampleSet, Size};

use crate::mapper::ColorMapper;
use crate::raster::Raster;

/// Per-frame inputs shared by every stage.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// Output raster size.
    pub output: Size,
    pub frame: u64,
    pub config: &'a EngineConfig,
}

/// What the last `advance` + `render` produced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldStats {
    /// Poses, mask hits or motion cells ingested this frame.
    pub detections: usize,
    /// Blobs evaluated (grid mode only).
    pub blob_count: usize,
    /// Largest accumulated value after ingest.
    pub peak: f32,
    /// Cells or pixels holding visible energy.
    pub active_cells: usize,
}

/// One rendering strategy.
pub trait FieldRenderer {
    /// Human-readable name (used for logs and stats).
    fn name(&self) -> &'static str;

    /// Reallocate buffers for a new output size or buffer geometry.
    /// All accumulated energy is discarded.
    fn resize(&mut self, output: Size, config: &EngineConfig);

    /// Decay existing energy and ingest `samples` (if any).
    fn advance(&mut self, ctx: &FieldContext<'_>, samples: Option<SampleSet>);

    /// Evaluate the field and write every pixel of `out`.
    fn render(&mut self, ctx: &FieldContext<'_>, mapper: &ColorMapper, out: &mut Raster);

    fn stats(&self) -> FieldStats;
}
