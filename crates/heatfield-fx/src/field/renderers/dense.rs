#![forbid(unsafe_code)]

//! Dense per-pixel renderer.
//!
//! Energy lives in a [`DecayBuffer`] at the configured processing
//! resolution. Video frames feed a [`MotionDetector`] at that resolution;
//! masks and keypoints are mapped to output pixels and then scaled down onto
//! the same buffer. After ingest the buffer is blurred in place, so
//! diffusion accumulates across frames. Rendering bilinearly upsamples each
//! output pixel and normalizes it by the frame peak.

use heatfield_core::{
    EngineConfig, KeypointFrame, OccupancyMask, PackedRgba, Point, SampleSet, Size,
    SourceMapping, VideoFrame, ViewMode,
};
use tracing::warn;

use crate::decay::TemporalDecay;
use crate::dense::DecayBuffer;
use crate::field::{FieldContext, FieldRenderer, FieldStats};
use crate::mapper::{ColorMapper, normalize};
use crate::motion::MotionDetector;
use crate::raster::Raster;
use crate::smoother::SpatialSmoother;
use crate::upsample::BilinearUpsampler;

#[derive(Debug, Clone)]
pub struct DenseFieldRenderer {
    buffer: DecayBuffer,
    smoother: SpatialSmoother,
    upsampler: BilinearUpsampler,
    motion: MotionDetector,
    /// Last camera frame, shown under the heat in overlay mode.
    underlay: Option<VideoFrame>,
    stats: FieldStats,
}

impl DenseFieldRenderer {
    pub fn new(config: &EngineConfig, _output: Size) -> Self {
        Self {
            buffer: DecayBuffer::new(config.processing, config.max_heat),
            smoother: SpatialSmoother::new(),
            upsampler: BilinearUpsampler::new(),
            motion: MotionDetector::new(config.processing),
            underlay: None,
            stats: FieldStats::default(),
        }
    }

    #[inline]
    pub fn buffer(&self) -> &DecayBuffer {
        &self.buffer
    }

    #[inline]
    pub fn has_underlay(&self) -> bool {
        self.underlay.is_some()
    }

    /// Add `amount` at the processing pixel under output point `p`.
    fn deposit_output_point(&mut self, p: Point, output: Size, amount: f32) -> bool {
        if output.is_empty() || !p.x.is_finite() || !p.y.is_finite() {
            return false;
        }
        let size = self.buffer.size();
        let x = (p.x * size.width as f32 / output.width as f32).floor() as i32;
        let y = (p.y * size.height as f32 / output.height as f32).floor() as i32;
        self.buffer.add(x, y, amount)
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
            self.deposit_output_point(p, ctx.output, config.injection_intensity);
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
                if !mask.is_occupied(x, y) {
                    continue;
                }
                let p = mapping.map(x as f32, y as f32);
                if self.deposit_output_point(p, ctx.output, config.injection_intensity) {
                    hits += 1;
                }
            }
        }
        hits
    }

    fn ingest_video(&mut self, frame: VideoFrame, ctx: &FieldContext<'_>) -> usize {
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
        let mut lit = 0;
        if let Some(energy) =
            self.motion
                .process(&frame, config.motion_sensitivity, config.accumulation)
        {
            let size = self.buffer.size();
            let w = size.width as usize;
            for (i, &e) in energy.iter().enumerate() {
                if e <= 0.0 {
                    continue;
                }
                let (x, y) = (i % w, i / w);
                let x = if config.mirror_x { w - 1 - x } else { x };
                self.buffer.add_index(y * w + x, e);
                lit += 1;
            }
        }
        self.underlay = Some(frame);
        lit
    }

    /// Camera pixel behind output pixel `(x, y)`, nearest-neighbour, mirrored
    /// like the motion input.
    fn underlay_at(&self, x: u32, y: u32, output: Size, mirror_x: bool) -> Option<PackedRgba> {
        let frame = self.underlay.as_ref()?;
        if frame.size.is_empty() || output.is_empty() {
            return None;
        }
        let mut sx = (x as u64 * frame.size.width as u64 / output.width as u64) as u32;
        let sy = (y as u64 * frame.size.height as u64 / output.height as u64) as u32;
        if mirror_x {
            sx = frame.size.width - 1 - sx.min(frame.size.width - 1);
        }
        let [r, g, b] = frame.rgb_at(sx, sy);
        Some(PackedRgba::rgb(r, g, b))
    }
}

impl FieldRenderer for DenseFieldRenderer {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn resize(&mut self, _output: Size, config: &EngineConfig) {
        self.buffer.resize(config.processing);
        self.buffer.set_max_heat(config.max_heat);
        self.motion.resize(config.processing);
        self.underlay = None;
        self.stats = FieldStats::default();
    }

    fn advance(&mut self, ctx: &FieldContext<'_>, samples: Option<SampleSet>) {
        let config = ctx.config;
        self.buffer.set_max_heat(config.max_heat);
        self.buffer.decay(TemporalDecay::from_config(config));

        let detections = match samples {
            Some(SampleSet::Video(frame)) => self.ingest_video(frame, ctx),
            Some(SampleSet::Mask(mask)) => self.ingest_mask(&mask, ctx),
            Some(SampleSet::Keypoints(frame)) => self.ingest_keypoints(&frame, ctx),
            None => 0,
        };

        self.buffer.smooth(&mut self.smoother, config.blur_passes);

        self.stats = FieldStats {
            detections,
            blob_count: 0,
            peak: self.buffer.peak(),
            active_cells: self.buffer.active_cells(config.peak_floor),
        };
    }

    fn render(&mut self, ctx: &FieldContext<'_>, mapper: &ColorMapper, out: &mut Raster) {
        let config = ctx.config;
        let output = ctx.output;
        self.upsampler.prepare(self.buffer.size(), output);
        let peak = self.buffer.peak();
        let overlay = mapper.view_mode() == ViewMode::Overlay;
        let values = self.buffer.values();
        for y in 0..output.height {
            for x in 0..output.width {
                let v = normalize(
                    self.upsampler.value(values, x, y),
                    peak,
                    config.peak_floor,
                    config.brightness,
                );
                let underlay = if overlay {
                    self.underlay_at(x, y, output, config.mirror_x)
                } else {
                    None
                };
                out.set(x, y, mapper.map(v, underlay));
            }
        }
    }

    fn stats(&self) -> FieldStats {
        self.stats
    }
}
