#![forbid(unsafe_code)]

//! Deterministic synthetic inputs.
//!
//! Each scenario stands in for one kind of capture adapter:
//!
//! | Scenario  | Sample          | Source size | Preset      |
//! |-----------|-----------------|-------------|-------------|
//! | `walkers` | 17-point poses  | 640x480     | metaballs   |
//! | `mask`    | moving ellipse  | 160x120     | metaballs   |
//! | `video`   | moving square   | 160x120     | dense       |
//!
//! All randomness comes from a seeded xorshift generator, so a seed and a
//! frame index always produce the same sample.

use std::fmt;

use heatfield_core::{
    EngineConfig, Keypoint, KeypointFrame, OccupancyMask, Pose, SampleSet, Size, VideoFrame,
};
use heatfield_fx::{EngineError, FrameStats, HeatEngine, Raster};

use crate::golden::compute_raster_checksum;

pub const DEFAULT_SEED: u32 = 0x5eed_1234;

const POSE_SOURCE: Size = Size::new(640, 480);
const CAMERA_SOURCE: Size = Size::new(160, 120);

/// Body-relative keypoint offsets in units of body height, COCO order.
const SKELETON: [(f32, f32); 17] = [
    (0.0, -0.45),
    (-0.03, -0.47),
    (0.03, -0.47),
    (-0.06, -0.46),
    (0.06, -0.46),
    (-0.12, -0.30),
    (0.12, -0.30),
    (-0.18, -0.12),
    (0.18, -0.12),
    (-0.20, 0.02),
    (0.20, 0.02),
    (-0.08, 0.05),
    (0.08, 0.05),
    (-0.09, 0.25),
    (0.09, 0.25),
    (-0.10, 0.45),
    (0.10, 0.45),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Walkers,
    Mask,
    Video,
}

impl Scenario {
    pub const ALL: [Self; 3] = [Self::Walkers, Self::Mask, Self::Video];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "walkers" | "pose" | "keypoints" => Some(Self::Walkers),
            "mask" | "segmentation" => Some(Self::Mask),
            "video" | "motion" => Some(Self::Video),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walkers => "walkers",
            Self::Mask => "mask",
            Self::Video => "video",
        }
    }

    /// Engine preset matching the installation this input came from.
    pub fn preset(self) -> EngineConfig {
        match self {
            Self::Walkers | Self::Mask => EngineConfig::default(),
            Self::Video => EngineConfig::dense(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal xorshift32; zero seeds are remapped.
#[derive(Debug, Clone)]
struct XorShift32(u32);

impl XorShift32 {
    fn new(seed: u32) -> Self {
        Self(if seed == 0 { DEFAULT_SEED } else { seed })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

/// Produces one [`SampleSet`] per frame for a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioSource {
    scenario: Scenario,
    rng: XorShift32,
    people: usize,
}

impl ScenarioSource {
    pub fn new(scenario: Scenario, seed: u32) -> Self {
        Self {
            scenario,
            rng: XorShift32::new(seed),
            people: 2,
        }
    }

    /// Number of walkers (walkers scenario only).
    #[must_use]
    pub fn with_people(mut self, people: usize) -> Self {
        self.people = people;
        self
    }

    #[inline]
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn sample(&mut self, frame: u64) -> SampleSet {
        match self.scenario {
            Scenario::Walkers => self.walkers(frame),
            Scenario::Mask => self.mask(frame),
            Scenario::Video => self.video(frame),
        }
    }

    fn walkers(&mut self, frame: u64) -> SampleSet {
        let t = frame as f32;
        let (w, h) = (POSE_SOURCE.width as f32, POSE_SOURCE.height as f32);
        let body = h * 0.6;
        let poses = (0..self.people)
            .map(|p| {
                let lane = (p as f32 + 0.5) / self.people.max(1) as f32;
                let cx = w * lane + (t * 0.05 + p as f32 * 1.7).sin() * w * 0.2;
                let cy = h * 0.5;
                let swing = (t * 0.3 + p as f32).sin() * 0.05;
                let keypoints = SKELETON
                    .iter()
                    .enumerate()
                    .map(|(k, &(dx, dy))| {
                        let limb = match k {
                            9 | 15 => swing,
                            10 | 16 => -swing,
                            _ => 0.0,
                        };
                        let x = cx + (dx + limb) * body + self.rng.range(-2.0, 2.0);
                        let y = cy + dy * body + self.rng.range(-2.0, 2.0);
                        // Feet drop out now and then, like a real detector.
                        let confidence = if k >= 15 && self.rng.next_f32() < 0.2 {
                            0.05
                        } else {
                            self.rng.range(0.5, 1.0)
                        };
                        Keypoint::new(x, y, confidence)
                    })
                    .collect();
                Pose::new(keypoints)
            })
            .collect();
        SampleSet::Keypoints(KeypointFrame::new(POSE_SOURCE, poses))
    }

    fn mask(&mut self, frame: u64) -> SampleSet {
        let t = frame as f32;
        let size = CAMERA_SOURCE;
        let cx = size.width as f32 * 0.5 + (t * 0.07).sin() * size.width as f32 * 0.3;
        let cy = size.height as f32 * 0.55;
        let (rx, ry) = (18.0 + self.rng.range(-1.0, 1.0), 40.0);
        let mut data = vec![0u8; size.area()];
        for y in 0..size.height {
            for x in 0..size.width {
                let nx = (x as f32 - cx) / rx;
                let ny = (y as f32 - cy) / ry;
                if nx * nx + ny * ny <= 1.0 {
                    data[(y * size.width + x) as usize] = 1;
                }
            }
        }
        SampleSet::Mask(OccupancyMask::new(size, data))
    }

    fn video(&mut self, frame: u64) -> SampleSet {
        let size = CAMERA_SOURCE;
        let side = 24u32;
        let travel = size.width - side;
        let sx = ((frame as u32).wrapping_mul(4)) % travel;
        let sy = size.height / 2 - side / 2;
        let mut rgba = Vec::with_capacity(size.area() * 4);
        for y in 0..size.height {
            for x in 0..size.width {
                let inside = x >= sx && x < sx + side && y >= sy && y < sy + side;
                let base = if inside {
                    235
                } else {
                    20 + (x * 40 / size.width) as u8
                };
                // Sensor noise well under the motion threshold.
                let noise = (self.rng.next_u32() % 5) as u8;
                let v = base.saturating_add(noise);
                rgba.extend_from_slice(&[v, v, v.saturating_sub(10), 255]);
            }
        }
        SampleSet::Video(VideoFrame::new(size, rgba))
    }
}

/// Checksums and stats from a full run.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRun {
    pub checksums: Vec<String>,
    pub stats: Vec<FrameStats>,
}

/// Run `frames` frames synchronously, calling `on_frame` after each.
pub fn run_scenario_with<F>(
    scenario: Scenario,
    config: EngineConfig,
    output: Size,
    frames: u64,
    seed: u32,
    mut on_frame: F,
) -> Result<ScenarioRun, EngineError>
where
    F: FnMut(&FrameStats, &Raster, &str),
{
    let mut engine = HeatEngine::new(config, output)?;
    let mut source = ScenarioSource::new(scenario, seed);
    let mut run = ScenarioRun::default();
    for frame in 0..frames {
        let stats = engine.render_frame(Some(source.sample(frame)));
        let checksum = compute_raster_checksum(engine.raster());
        on_frame(&stats, engine.raster(), &checksum);
        run.checksums.push(checksum);
        run.stats.push(stats);
    }
    Ok(run)
}

pub fn run_scenario(
    scenario: Scenario,
    config: EngineConfig,
    output: Size,
    frames: u64,
    seed: u32,
) -> Result<ScenarioRun, EngineError> {
    run_scenario_with(scenario, config, output, frames, seed, |_, _, _| {})
}
