#![forbid(unsafe_code)]

//! Frame loop owner.
//!
//! [`HeatEngine`] holds the active [`FieldRenderer`], the color mapper and
//! the output raster. One [`render_frame`](HeatEngine::render_frame) call is
//! one full pipeline pass. Resizes requested between frames are applied at
//! the start of the next pass; config swaps take effect immediately and
//! reallocate only when buffer geometry changes.

use std::fmt;
use std::time::Duration;

use heatfield_core::{ConfigError, EngineConfig, SampleSet, SampleSlot, Size};
use tracing::{debug, debug_span, trace, warn};
use web_time::Instant;

use crate::field::renderers;
use crate::field::{FieldContext, FieldRenderer, FieldStats};
use crate::mapper::ColorMapper;
use crate::raster::Raster;

/// Engine construction / reconfiguration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The config failed validation; every violation is listed.
    InvalidConfig(Vec<ConfigError>),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(errors) => {
                write!(f, "invalid engine config")?;
                for (i, e) in errors.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Per-frame summary returned by [`HeatEngine::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Zero-based frame index.
    pub frame: u64,
    pub renderer: &'static str,
    pub detections: usize,
    pub blob_count: usize,
    pub peak: f32,
    pub active_cells: usize,
    /// Wall time of the whole pass.
    pub elapsed: Duration,
}

impl FrameStats {
    fn from_field(frame: u64, renderer: &'static str, field: FieldStats, elapsed: Duration) -> Self {
        Self {
            frame,
            renderer,
            detections: field.detections,
            blob_count: field.blob_count,
            peak: field.peak,
            active_cells: field.active_cells,
            elapsed,
        }
    }
}

pub struct HeatEngine {
    config: EngineConfig,
    output: Size,
    pending_resize: Option<Size>,
    renderer: Box<dyn FieldRenderer + Send>,
    mapper: ColorMapper,
    raster: Raster,
    frame: u64,
    last_stats: Option<FrameStats>,
}

impl fmt::Debug for HeatEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeatEngine")
            .field("renderer", &self.renderer.name())
            .field("output", &self.output)
            .field("frame", &self.frame)
            .field("pending_resize", &self.pending_resize)
            .finish_non_exhaustive()
    }
}

impl HeatEngine {
    /// Validate `config` and allocate buffers for `output`.
    pub fn new(config: EngineConfig, output: Size) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        let renderer = renderers::build(&config, output);
        debug!(
            renderer = renderer.name(),
            width = output.width,
            height = output.height,
            config = %config.summary_short(),
            "heat engine created"
        );
        Ok(Self {
            mapper: ColorMapper::from_config(&config),
            raster: Raster::new(output, config.background),
            renderer,
            config,
            output,
            pending_resize: None,
            frame: 0,
            last_stats: None,
        })
    }

    /// Replace the configuration between frames.
    ///
    /// A config that fails validation is rejected and the current one stays
    /// active. Changing the renderer, cell size or processing resolution
    /// reallocates (zero-filled); anything else keeps accumulated energy.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        if let Err(errors) = config.validate() {
            warn!(
                errors = errors.len(),
                first = ?errors.first(),
                "config swap rejected"
            );
            return Err(EngineError::InvalidConfig(errors));
        }

        if config.renderer != self.config.renderer {
            self.renderer = renderers::build(&config, self.output);
            debug!(
                from = self.config.renderer.as_str(),
                to = config.renderer.as_str(),
                "renderer swapped"
            );
        } else if config.geometry_differs(&self.config) {
            self.renderer.resize(self.output, &config);
            debug!(
                cell_size = config.cell_size,
                processing = %config.processing,
                "buffer geometry changed"
            );
        }

        self.mapper = ColorMapper::from_config(&config);
        debug!(config = %config.summary_short(), "config swapped");
        self.config = config;
        Ok(())
    }

    /// Record a new output size; applied at the start of the next frame.
    pub fn request_resize(&mut self, output: Size) {
        if output == self.output {
            self.pending_resize = None;
        } else {
            self.pending_resize = Some(output);
        }
    }

    /// Resize now. Accumulated energy is discarded.
    pub fn resize(&mut self, output: Size) {
        self.pending_resize = None;
        if output == self.output {
            return;
        }
        debug!(
            from = %self.output,
            to = %output,
            renderer = self.renderer.name(),
            "resize"
        );
        self.output = output;
        self.renderer.resize(output, &self.config);
        self.raster.resize(output, self.config.background);
    }

    /// Run one full pipeline pass over `samples` (or decay only).
    pub fn render_frame(&mut self, samples: Option<SampleSet>) -> FrameStats {
        let start = Instant::now();
        let _span = debug_span!(
            "heat_frame",
            frame = self.frame,
            renderer = self.renderer.name()
        )
        .entered();

        if let Some(size) = self.pending_resize.take() {
            self.resize(size);
        }

        let ctx = FieldContext {
            output: self.output,
            frame: self.frame,
            config: &self.config,
        };
        self.renderer.advance(&ctx, samples);
        self.renderer.render(&ctx, &self.mapper, &mut self.raster);

        let stats = FrameStats::from_field(
            self.frame,
            self.renderer.name(),
            self.renderer.stats(),
            start.elapsed(),
        );
        trace!(
            detections = stats.detections,
            blobs = stats.blob_count,
            peak = stats.peak,
            active = stats.active_cells,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "frame rendered"
        );

        self.frame += 1;
        self.last_stats = Some(stats);
        stats
    }

    /// Take whatever the slot holds and render one frame.
    pub fn render_from_slot(&mut self, slot: &SampleSlot) -> FrameStats {
        self.render_frame(slot.take())
    }

    #[inline]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Stats of the most recent frame, if any has run.
    #[inline]
    pub fn stats(&self) -> Option<&FrameStats> {
        self.last_stats.as_ref()
    }

    #[inline]
    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn output_size(&self) -> Size {
        self.output
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatfield_core::{Keypoint, KeypointFrame, Palette, Pose, RendererKind, VideoFrame};

    const OUTPUT: Size = Size::new(320, 240);

    fn walker(x: f32) -> SampleSet {
        let keypoints = (0..17)
            .map(|i| Keypoint::new(x + (i % 3) as f32 * 5.0, 60.0 + (i / 3) as f32 * 18.0, 0.8))
            .collect();
        SampleSet::Keypoints(KeypointFrame::new(OUTPUT, vec![Pose::new(keypoints)]))
    }

    fn gray_frame(level: u8) -> SampleSet {
        SampleSet::Video(VideoFrame::new(
            Size::new(80, 60),
            vec![level; 80 * 60 * 4],
        ))
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = EngineConfig {
            decay: 1.5,
            influence_softening: 0.0,
            ..EngineConfig::default()
        };
        let Err(EngineError::InvalidConfig(errors)) = HeatEngine::new(config, OUTPUT) else {
            panic!("expected invalid config");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"decay"));
        assert!(fields.contains(&"influence_softening"));
    }

    #[test]
    fn error_display_lists_fields() {
        let err = EngineError::InvalidConfig(vec![
            ConfigError::new("decay", "1.5".to_string(), "must be in [0, 1)"),
            ConfigError::new("cell_size", "0".to_string(), "must be >= 1"),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("invalid engine config: decay=1.5"));
        assert!(text.contains("; cell_size=0"));
    }

    #[test]
    fn metaball_frames_are_opaque_and_counted() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        let mut last = None;
        for f in 0..5 {
            let stats = engine.render_frame(Some(walker(100.0 + f as f32 * 10.0)));
            assert_eq!(stats.frame, f);
            assert_eq!(stats.renderer, "metaballs");
            last = Some(stats);
        }
        let stats = last.expect("ran");
        assert_eq!(stats.detections, 1);
        assert!(stats.blob_count > 0);
        assert!(engine.raster().is_opaque());
        assert_eq!(engine.raster().size(), OUTPUT);
        assert_eq!(engine.frame_count(), 5);
        assert_eq!(engine.stats(), Some(&stats));
    }

    #[test]
    fn dense_frames_follow_motion() {
        let mut engine = HeatEngine::new(EngineConfig::dense(), OUTPUT).expect("engine");
        assert_eq!(engine.renderer_name(), "dense");
        engine.render_frame(Some(gray_frame(0)));
        let stats = engine.render_frame(Some(gray_frame(255)));
        assert!(stats.detections > 0);
        assert!(stats.peak > 0.0);
        assert_eq!(stats.blob_count, 0);
        assert!(engine.raster().is_opaque());
    }

    #[test]
    fn decay_only_frames_converge_to_background() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        engine.render_frame(Some(walker(150.0)));
        let mut peak = engine.stats().map_or(0.0, |s| s.peak);
        for _ in 0..60 {
            let stats = engine.render_frame(None);
            assert!(stats.peak <= peak);
            peak = stats.peak;
        }
        assert!(peak < 1e-6);
        let bg = engine.config().background;
        assert!(engine.raster().pixels().iter().all(|&p| p == bg));
    }

    #[test]
    fn resize_is_deferred_to_next_frame() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        engine.render_frame(Some(walker(150.0)));
        engine.request_resize(Size::new(640, 360));
        assert_eq!(engine.output_size(), OUTPUT);
        assert_eq!(engine.raster().size(), OUTPUT);

        let stats = engine.render_frame(None);
        assert_eq!(engine.output_size(), Size::new(640, 360));
        assert_eq!(engine.raster().size(), Size::new(640, 360));
        // Energy in flight is dropped on reallocation.
        assert_eq!(stats.peak, 0.0);
        assert_eq!(stats.blob_count, 0);
    }

    #[test]
    fn resize_to_same_size_keeps_energy() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        engine.render_frame(Some(walker(150.0)));
        engine.request_resize(OUTPUT);
        let stats = engine.render_frame(None);
        assert!(stats.peak > 0.0);
    }

    #[test]
    fn rejected_swap_keeps_previous_config() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        let bad = EngineConfig {
            cell_size: 0,
            ..EngineConfig::default()
        };
        assert!(engine.set_config(bad).is_err());
        assert_eq!(engine.config(), &EngineConfig::default());
    }

    #[test]
    fn palette_swap_keeps_energy() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        engine.render_frame(Some(walker(150.0)));
        let swapped = EngineConfig {
            palette: Palette::Cool,
            decay: 0.9,
            ..EngineConfig::default()
        };
        engine.set_config(swapped).expect("valid");
        let stats = engine.render_frame(None);
        assert!(stats.peak > 0.0);
        assert_eq!(engine.config().palette, Palette::Cool);
    }

    #[test]
    fn geometry_swap_reallocates() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        engine.render_frame(Some(walker(150.0)));
        let swapped = EngineConfig {
            cell_size: 10,
            ..EngineConfig::default()
        };
        engine.set_config(swapped).expect("valid");
        let stats = engine.render_frame(None);
        assert_eq!(stats.peak, 0.0);
    }

    #[test]
    fn renderer_swap_changes_strategy() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        engine.render_frame(Some(walker(150.0)));
        engine
            .set_config(EngineConfig::preset(RendererKind::Dense))
            .expect("valid");
        assert_eq!(engine.renderer_name(), "dense");
        let stats = engine.render_frame(Some(walker(150.0)));
        assert_eq!(stats.renderer, "dense");
        assert!(engine.raster().is_opaque());
    }

    #[test]
    fn slot_delivers_latest_only() {
        let mut engine = HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
        let slot = SampleSlot::new();
        slot.publish(walker(40.0));
        slot.publish(walker(250.0));
        let stats = engine.render_from_slot(&slot);
        assert_eq!(stats.detections, 1);
        let stats = engine.render_from_slot(&slot);
        assert_eq!(stats.detections, 0);
    }

    #[test]
    fn identical_inputs_render_identically() {
        let run = || {
            let mut engine =
                HeatEngine::new(EngineConfig::default(), OUTPUT).expect("engine");
            for f in 0..6 {
                engine.render_frame(Some(walker(60.0 + f as f32 * 20.0)));
            }
            engine.raster().to_rgba8()
        };
        assert_eq!(run(), run());
    }
}
