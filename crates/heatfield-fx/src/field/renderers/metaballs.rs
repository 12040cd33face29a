#![forbid(unsafe_code)]

//! Grid + metaball renderer.
//!
//! Keypoints spread radially into a coarse [`HeatGrid`]; occupancy masks
//! deposit into single cells; video goes through a [`MotionDetector`] at
//! grid resolution. Cells above the noise floor become blobs and the
//! metaball field is swept at `metaball_step` pixels, filling
//! `step x step` blocks.

use heatfield_core::{
    EngineConfig, KeypointFrame, OccupancyMask, Point, SampleSet, Size, SourceMapping,
    VideoFrame,
};
use tracing::warn;

use crate::blob::{Blob, BlobExtractor};
use crate::decay::TemporalDecay;
use crate::field::{FieldContext, FieldRenderer, FieldStats};
use crate::grid::HeatGrid;
use crate::mapper::ColorMapper;
use crate::metaball::{MetaballField, MetaballParams};
use crate::motion::MotionDetector;
use crate::raster::Raster;

#[derive(Debug, Clone)]
pub struct GridMetaballRenderer {
    grid: HeatGrid,
    blobs: Vec<Blob>,
    field: MetaballField,
    motion: MotionDetector,
    stats: FieldStats,
}

impl GridMetaballRenderer {
    pub fn new(config: &EngineConfig, output: Size) -> Self {
        let grid = HeatGrid::new(output, config.cell_size, config.max_heat);
        let motion = MotionDetector::new(grid.dims());
        Self {
            grid,
            blobs: Vec::new(),
            field: MetaballField::new(MetaballParams::from_config(config)),
            motion,
            stats: FieldStats::default(),
        }
    }

    #[inline]
    pub fn grid(&self) -> &HeatGrid {
        &self.grid
    }

    #[inline]
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    fn ingest_keypoints(&mut self, frame: &KeypointFrame, ctx: &FieldContext<'_>) -> usize {
        if frame.source.is_empty() {
            warn!(
                frame = ctx.frame,
                source = %frame.source,
                "keypoint source has no area; skipped"
            );
            return 0;
        }
        let config = ctx.config;
        let mapping = SourceMapping::new(frame.source, ctx.output, frame.fit, config.mirror_x);
        for kp in frame.keypoints() {
            if !(kp.confidence > config.confidence_floor) {
                continue;
            }
            let p = mapping.map(kp.x, kp.y);
            self.grid
                .inject_at(p, config.injection_intensity, config.spread_radius);
        }
        frame.poses.len()
    }

    fn ingest_mask(&mut self, mask: &OccupancyMask, ctx: &FieldContext<'_>) -> usize {
        if !mask.is_well_formed() {
            warn!(
                frame = ctx.frame,
                size = %mask.size,
                len = mask.data.len(),
                "mask buffer does not match its size; skipped"
            );
            return 0;
        }
        if mask.size.is_empty() {
            warn!(frame = ctx.frame, "mask has no area; skipped");
            return 0;
        }
        let config = ctx.config;
        let mapping = SourceMapping::new(mask.size, ctx.output, mask.fit, config.mirror_x);
        let stride = config.mask_stride.max(1) as usize;
        let mut hits = 0;
        for y in (0..mask.size.height).step_by(stride) {
            for x in (0..mask.size.width).step_by(stride) {
                if mask.is_occupied(x, y) {
                    let p = mapping.map(x as f32, y as f32);
                    if self.grid.deposit_at(p, config.injection_intensity) {
                        hits += 1;
                    }
                }
            }
        }
        hits
    }

    fn ingest_video(&mut self, frame: &VideoFrame, ctx: &FieldContext<'_>) -> usize {
        if !frame.is_well_formed() {
            warn!(
                frame = ctx.frame,
                size = %frame.size,
                len = frame.rgba.len(),
                "video buffer does not match its size; skipped"
            );
            return 0;
        }
        let config = ctx.config;
        let Some(energy) =
            self.motion
                .process(frame, config.motion_sensitivity, config.accumulation)
        else {
            return 0;
        };
        let dims = self.grid.dims();
        let mut lit = 0;
        for (i, &e) in energy.iter().enumerate() {
            if e <= 0.0 {
                continue;
            }
            let row = (i / dims.width as usize) as i32;
            let mut col = (i % dims.width as usize) as i32;
            if config.mirror_x {
                col = dims.width as i32 - 1 - col;
            }
            self.grid.deposit(col, row, e * config.injection_intensity);
            lit += 1;
        }
        lit
    }
}

impl FieldRenderer for GridMetaballRenderer {
    fn name(&self) -> &'static str {
        "metaballs"
    }

    fn resize(&mut self, output: Size, config: &EngineConfig) {
        self.grid.resize(output, config.cell_size);
        self.grid.set_max_heat(config.max_heat);
        self.motion.resize(self.grid.dims());
        self.blobs.clear();
        self.stats = FieldStats::default();
    }

    fn advance(&mut self, ctx: &FieldContext<'_>, samples: Option<SampleSet>) {
        let config = ctx.config;
        self.grid.set_max_heat(config.max_heat);
        self.field.set_params(MetaballParams::from_config(config));

        self.grid.decay_and_cap(TemporalDecay::from_config(config));

        let detections = match samples {
            Some(SampleSet::Keypoints(frame)) => self.ingest_keypoints(&frame, ctx),
            Some(SampleSet::Mask(mask)) => self.ingest_mask(&mask, ctx),
            Some(SampleSet::Video(frame)) => self.ingest_video(&frame, ctx),
            None => 0,
        };

        BlobExtractor::from_config(config).extract_into(&self.grid, &mut self.blobs);

        self.stats = FieldStats {
            detections,
            blob_count: self.blobs.len(),
            peak: self.grid.peak(),
            active_cells: self.grid.active_cells(config.blob_noise_floor),
        };
    }

    fn render(&mut self, ctx: &FieldContext<'_>, mapper: &ColorMapper, out: &mut Raster) {
        out.clear(mapper.background());
        if self.blobs.is_empty() || ctx.output.is_empty() {
            return;
        }
        self.field.prepare(&self.blobs);
        let step = ctx.config.metaball_step.max(1);
        for y in (0..ctx.output.height).step_by(step as usize) {
            for x in (0..ctx.output.width).step_by(step as usize) {
                if let Some(heat) = self.field.heat_at(Point::new(x as f32, y as f32)) {
                    out.fill_block(x, y, step, step, mapper.map(heat, None));
                }
            }
        }
    }

    fn stats(&self) -> FieldStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatfield_core::{FitMode, Keypoint, PackedRgba, Pose};

    fn config() -> EngineConfig {
        EngineConfig {
            mirror_x: false,
            ..EngineConfig::default()
        }
    }

    fn ctx(config: &EngineConfig, frame: u64) -> FieldContext<'_> {
        FieldContext {
            output: Size::new(320, 240),
            frame,
            config,
        }
    }

    fn person_at(x: f32, y: f32) -> SampleSet {
        let keypoints = (0..17)
            .map(|i| Keypoint::new(x + (i % 3) as f32 * 4.0, y + (i / 3) as f32 * 6.0, 0.9))
            .collect();
        SampleSet::Keypoints(KeypointFrame::new(
            Size::new(320, 240),
            vec![Pose::new(keypoints)],
        ))
    }

    fn hash_pixels(pixels: &[PackedRgba]) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for px in pixels {
            hash ^= px.0 as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    #[test]
    fn keypoints_heat_grid_and_emit_blobs() {
        let config = config();
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        r.advance(&ctx(&config, 0), Some(person_at(150.0, 100.0)));
        let stats = r.stats();
        assert_eq!(stats.detections, 1);
        assert!(stats.blob_count > 0);
        assert!(stats.peak > 0.0 && stats.peak <= config.max_heat);
        assert!(r.grid().get(7, 5) > 0.0);
    }

    #[test]
    fn low_confidence_keypoints_are_skipped() {
        let config = config();
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        let frame = KeypointFrame::new(
            Size::new(320, 240),
            vec![Pose::new(vec![
                Keypoint::new(100.0, 100.0, 0.1),
                Keypoint::new(100.0, 100.0, 0.05),
            ])],
        );
        r.advance(&ctx(&config, 0), Some(SampleSet::Keypoints(frame)));
        assert_eq!(r.grid().total(), 0.0);
    }

    #[test]
    fn mirroring_flips_columns() {
        let config = EngineConfig {
            mirror_x: true,
            spread_radius: 0.0,
            ..EngineConfig::default()
        };
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        let frame = KeypointFrame::new(
            Size::new(320, 240),
            vec![Pose::new(vec![Keypoint::new(10.0, 10.0, 1.0)])],
        );
        r.advance(&ctx(&config, 0), Some(SampleSet::Keypoints(frame)));
        // x' = 320 - 10 = 310 -> column 15.
        assert_eq!(r.grid().get(15, 0), config.injection_intensity);
        assert_eq!(r.grid().get(0, 0), 0.0);
    }

    #[test]
    fn mask_deposits_single_cells() {
        let config = config();
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        let mut data = vec![0u8; 320 * 240];
        data[0] = 1;
        let mut mask = OccupancyMask::new(Size::new(320, 240), data);
        mask.fit = FitMode::Stretch;
        r.advance(&ctx(&config, 0), Some(SampleSet::Mask(mask)));
        assert_eq!(r.stats().detections, 1);
        assert_eq!(r.grid().get(0, 0), config.injection_intensity);
        assert_eq!(r.grid().total(), config.injection_intensity);
    }

    #[test]
    fn empty_source_deposits_nothing() {
        for mirror_x in [false, true] {
            let config = EngineConfig {
                mirror_x,
                ..EngineConfig::default()
            };
            let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
            let pose = Pose::new(vec![Keypoint::new(100.0, 100.0, 1.0); 5]);
            let frame = KeypointFrame::new(Size::new(0, 0), vec![pose]);
            r.advance(&ctx(&config, 0), Some(SampleSet::Keypoints(frame)));
            assert_eq!(r.grid().total(), 0.0, "mirror_x={mirror_x}");
            assert_eq!(r.stats().detections, 0);
            assert!(r.blobs().is_empty());

            let mask = OccupancyMask::new(Size::new(0, 0), Vec::new());
            r.advance(&ctx(&config, 1), Some(SampleSet::Mask(mask)));
            assert_eq!(r.grid().total(), 0.0, "mirror_x={mirror_x}");
        }
    }

    #[test]
    fn resize_restarts_motion_history() {
        let config = config();
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        let dark = VideoFrame::new(Size::new(64, 48), vec![0; 64 * 48 * 4]);
        let bright = VideoFrame::new(Size::new(64, 48), vec![255; 64 * 48 * 4]);
        r.advance(&ctx(&config, 0), Some(SampleSet::Video(dark)));
        r.resize(Size::new(640, 480), &config);
        // The first frame after a resize only primes, even with a big change.
        r.advance(&ctx(&config, 1), Some(SampleSet::Video(bright)));
        assert_eq!(r.grid().total(), 0.0);
        assert_eq!(r.stats().detections, 0);
    }

    #[test]
    fn malformed_mask_is_ignored() {
        let config = config();
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        let mask = OccupancyMask::new(Size::new(320, 240), vec![1; 7]);
        r.advance(&ctx(&config, 0), Some(SampleSet::Mask(mask)));
        assert_eq!(r.grid().total(), 0.0);
    }

    #[test]
    fn video_motion_heats_cells() {
        let config = config();
        let output = Size::new(320, 240);
        let mut r = GridMetaballRenderer::new(&config, output);
        let dark = VideoFrame::new(Size::new(64, 48), vec![0; 64 * 48 * 4]);
        let bright = VideoFrame::new(Size::new(64, 48), vec![255; 64 * 48 * 4]);
        r.advance(&ctx(&config, 0), Some(SampleSet::Video(dark)));
        assert_eq!(r.grid().total(), 0.0);
        r.advance(&ctx(&config, 1), Some(SampleSet::Video(bright)));
        assert_eq!(r.stats().detections, r.grid().dims().area());
        assert!(r.grid().peak() > 0.0);
    }

    #[test]
    fn render_fills_background_then_blocks() {
        let config = config();
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        let mapper = ColorMapper::from_config(&config);
        let mut out = Raster::new(Size::new(320, 240), PackedRgba::WHITE);

        r.render(&ctx(&config, 0), &mapper, &mut out);
        assert!(out.pixels().iter().all(|&p| p == config.background));

        r.advance(&ctx(&config, 0), Some(person_at(150.0, 100.0)));
        r.render(&ctx(&config, 0), &mapper, &mut out);
        assert!(out.is_opaque());
        assert!(out.pixels().iter().any(|&p| p != config.background));
        // Sweep blocks are uniform.
        let c = out.get(144, 96);
        for dy in 0..12 {
            for dx in 0..12 {
                assert_eq!(out.get(144 + dx, 96 + dy), c);
            }
        }
    }

    #[test]
    fn deterministic_for_fixed_inputs() {
        let config = config();
        let mapper = ColorMapper::from_config(&config);
        let run = || {
            let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
            let mut out = Raster::new(Size::new(320, 240), PackedRgba::BLACK);
            for f in 0..4 {
                r.advance(&ctx(&config, f), Some(person_at(100.0 + f as f32 * 8.0, 90.0)));
                r.render(&ctx(&config, f), &mapper, &mut out);
            }
            hash_pixels(out.pixels())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn no_samples_fades_to_background() {
        let config = config();
        let mapper = ColorMapper::from_config(&config);
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        let mut out = Raster::new(Size::new(320, 240), PackedRgba::BLACK);
        r.advance(&ctx(&config, 0), Some(person_at(150.0, 100.0)));
        let mut last = r.grid().total();
        for f in 1..40 {
            r.advance(&ctx(&config, f), None);
            let total = r.grid().total();
            assert!(total <= last);
            last = total;
        }
        r.render(&ctx(&config, 40), &mapper, &mut out);
        assert_eq!(r.stats().blob_count, 0);
        assert!(out.pixels().iter().all(|&p| p == config.background));
    }

    #[test]
    fn tiny_output_is_safe() {
        let config = config();
        let mapper = ColorMapper::from_config(&config);
        for (w, h) in [(0, 0), (1, 1), (19, 19), (21, 5)] {
            let size = Size::new(w, h);
            let mut r = GridMetaballRenderer::new(&config, size);
            let mut out = Raster::new(size, PackedRgba::BLACK);
            let c = FieldContext {
                output: size,
                frame: 0,
                config: &config,
            };
            r.advance(&c, Some(person_at(0.0, 0.0)));
            r.render(&c, &mapper, &mut out);
        }
    }

    #[test]
    fn resize_discards_energy() {
        let config = config();
        let mut r = GridMetaballRenderer::new(&config, Size::new(320, 240));
        r.advance(&ctx(&config, 0), Some(person_at(150.0, 100.0)));
        r.resize(Size::new(640, 480), &config);
        assert_eq!(r.grid().dims(), Size::new(32, 24));
        assert_eq!(r.grid().total(), 0.0);
        assert!(r.blobs().is_empty());
    }
}
