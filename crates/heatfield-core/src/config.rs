#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`EngineConfig`] is a flat set of named parameters. Any field may be
//! changed between frames; the engine decides whether a change needs its
//! buffers reallocated (see [`EngineConfig::geometry_differs`]).
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HEATFIELD_RENDERER` | `renderer` (`metaballs`/`dense`; selects the preset the rest apply to) |
//! | `HEATFIELD_DECAY` | `decay` |
//! | `HEATFIELD_MAX_HEAT` | `max_heat` |
//! | `HEATFIELD_INJECTION` | `injection_intensity` |
//! | `HEATFIELD_SPREAD_RADIUS` | `spread_radius` |
//! | `HEATFIELD_CELL_SIZE` | `cell_size` |
//! | `HEATFIELD_CONFIDENCE_FLOOR` | `confidence_floor` |
//! | `HEATFIELD_MASK_STRIDE` | `mask_stride` |
//! | `HEATFIELD_NOISE_FLOOR` | `blob_noise_floor` |
//! | `HEATFIELD_MAX_BLOBS` | `max_blobs` (0 = unbounded) |
//! | `HEATFIELD_BLOB_RADIUS` | `blob_radius` |
//! | `HEATFIELD_BLOB_THRESHOLD` | `blob_threshold` |
//! | `HEATFIELD_SOFTENING` | `influence_softening` |
//! | `HEATFIELD_INFLUENCE_CUTOFF` | `influence_cutoff` |
//! | `HEATFIELD_METABALL_STEP` | `metaball_step` |
//! | `HEATFIELD_HEAT_SENSITIVITY` | `heat_sensitivity` |
//! | `HEATFIELD_MAX_FIELD_HEAT` | `max_field_heat` |
//! | `HEATFIELD_INTENSITY_MULTIPLIER` | `intensity_multiplier` |
//! | `HEATFIELD_BLUR_PASSES` | `blur_passes` |
//! | `HEATFIELD_PROCESSING_SIZE` | `processing` (`WxH`) |
//! | `HEATFIELD_MOTION_SENSITIVITY` | `motion_sensitivity` |
//! | `HEATFIELD_ACCUMULATION` | `accumulation` |
//! | `HEATFIELD_BRIGHTNESS` | `brightness` |
//! | `HEATFIELD_PEAK_FLOOR` | `peak_floor` |
//! | `HEATFIELD_VIEW_MODE` | `view_mode` |
//! | `HEATFIELD_PALETTE` | `palette` |
//! | `HEATFIELD_GRADIENT` | `palette` as a custom `heat:rrggbb,...` table |
//! | `HEATFIELD_BACKGROUND` | `background` (`rrggbb`) |
//! | `HEATFIELD_MIRROR` | `mirror_x` |

use std::env;
use std::fmt;

use crate::color::PackedRgba;
use crate::geometry::Size;
use crate::gradient::ColorGradient;
use crate::palette::Palette;

pub const ENV_RENDERER: &str = "HEATFIELD_RENDERER";
const ENV_DECAY: &str = "HEATFIELD_DECAY";
const ENV_MAX_HEAT: &str = "HEATFIELD_MAX_HEAT";
const ENV_INJECTION: &str = "HEATFIELD_INJECTION";
const ENV_SPREAD_RADIUS: &str = "HEATFIELD_SPREAD_RADIUS";
const ENV_CELL_SIZE: &str = "HEATFIELD_CELL_SIZE";
const ENV_CONFIDENCE_FLOOR: &str = "HEATFIELD_CONFIDENCE_FLOOR";
const ENV_MASK_STRIDE: &str = "HEATFIELD_MASK_STRIDE";
const ENV_NOISE_FLOOR: &str = "HEATFIELD_NOISE_FLOOR";
const ENV_MAX_BLOBS: &str = "HEATFIELD_MAX_BLOBS";
const ENV_BLOB_RADIUS: &str = "HEATFIELD_BLOB_RADIUS";
const ENV_BLOB_THRESHOLD: &str = "HEATFIELD_BLOB_THRESHOLD";
const ENV_SOFTENING: &str = "HEATFIELD_SOFTENING";
const ENV_INFLUENCE_CUTOFF: &str = "HEATFIELD_INFLUENCE_CUTOFF";
const ENV_METABALL_STEP: &str = "HEATFIELD_METABALL_STEP";
const ENV_HEAT_SENSITIVITY: &str = "HEATFIELD_HEAT_SENSITIVITY";
const ENV_MAX_FIELD_HEAT: &str = "HEATFIELD_MAX_FIELD_HEAT";
const ENV_INTENSITY_MULTIPLIER: &str = "HEATFIELD_INTENSITY_MULTIPLIER";
const ENV_BLUR_PASSES: &str = "HEATFIELD_BLUR_PASSES";
const ENV_PROCESSING_SIZE: &str = "HEATFIELD_PROCESSING_SIZE";
const ENV_MOTION_SENSITIVITY: &str = "HEATFIELD_MOTION_SENSITIVITY";
const ENV_ACCUMULATION: &str = "HEATFIELD_ACCUMULATION";
const ENV_BRIGHTNESS: &str = "HEATFIELD_BRIGHTNESS";
const ENV_PEAK_FLOOR: &str = "HEATFIELD_PEAK_FLOOR";
const ENV_VIEW_MODE: &str = "HEATFIELD_VIEW_MODE";
const ENV_PALETTE: &str = "HEATFIELD_PALETTE";
const ENV_GRADIENT: &str = "HEATFIELD_GRADIENT";
const ENV_BACKGROUND: &str = "HEATFIELD_BACKGROUND";
const ENV_MIRROR: &str = "HEATFIELD_MIRROR";

/// Which field renderer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RendererKind {
    /// Coarse heat grid, blob extraction and metaball field.
    #[default]
    Metaballs,
    /// Per-pixel decay buffer, iterative blur and bilinear upsampling.
    Dense,
}

impl RendererKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "metaballs" | "metaball" | "grid" => Some(Self::Metaballs),
            "dense" | "blur" => Some(Self::Dense),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metaballs => "metaballs",
            Self::Dense => "dense",
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How normalized heat becomes a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    /// Palette color.
    #[default]
    Heatmap,
    /// Palette color blended over a dimmed camera underlay.
    Overlay,
    /// Grayscale `v * 255`.
    Diff,
}

impl ViewMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "heatmap" | "heat" => Some(Self::Heatmap),
            "overlay" => Some(Self::Overlay),
            "diff" | "gray" | "grey" => Some(Self::Diff),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heatmap => "heatmap",
            Self::Overlay => "overlay",
            Self::Diff => "diff",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat engine configuration.
///
/// `Default` is the keypoint/metaball preset; [`EngineConfig::dense`] is the
/// motion-heatmap preset.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub renderer: RendererKind,
    /// Multiplicative per-frame decay in `[0, 1)`.
    pub decay: f32,
    /// Upper bound for every accumulated cell.
    pub max_heat: f32,
    /// Energy added per keypoint or mask hit.
    pub injection_intensity: f32,
    /// Keypoint spread radius, in grid cells.
    pub spread_radius: f32,
    /// Output pixels per grid cell.
    pub cell_size: u32,
    /// Keypoints with confidence at or below this are skipped.
    pub confidence_floor: f32,
    /// Mask sampling stride in mask pixels.
    pub mask_stride: u32,
    /// Minimum cell energy that produces a blob.
    pub blob_noise_floor: f32,
    /// Keep only the hottest N blobs; 0 keeps all.
    pub max_blobs: usize,
    /// Metaball base radius in output pixels.
    pub blob_radius: f32,
    /// Field sum above which a point is visible.
    pub blob_threshold: f32,
    /// Softening constant added to squared distance.
    pub influence_softening: f32,
    /// Minimum single-blob influence that counts towards peak brightness.
    pub influence_cutoff: f32,
    /// Metaball raster sweep step in output pixels.
    pub metaball_step: u32,
    /// Field sum mapped to `max_field_heat`.
    pub heat_sensitivity: f32,
    pub max_field_heat: f32,
    pub intensity_multiplier: f32,
    pub blur_passes: u32,
    /// Dense processing grid resolution.
    pub processing: Size,
    /// Luminance difference (0..1) below which motion is ignored.
    pub motion_sensitivity: f32,
    /// Gain applied to luminance difference above sensitivity.
    pub accumulation: f32,
    pub brightness: f32,
    /// Lower bound on the dense peak used for normalization.
    pub peak_floor: f32,
    pub view_mode: ViewMode,
    pub palette: Palette,
    /// Color of points with no visible heat.
    pub background: PackedRgba,
    /// Mirror all inputs horizontally.
    pub mirror_x: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::Metaballs,
            decay: 0.5,
            max_heat: 50.0,
            injection_intensity: 5.0,
            spread_radius: 4.0,
            cell_size: 20,
            confidence_floor: 0.1,
            mask_stride: 4,
            blob_noise_floor: 2.0,
            max_blobs: 0,
            blob_radius: 45.0,
            blob_threshold: 0.8,
            influence_softening: 100.0,
            influence_cutoff: 0.1,
            metaball_step: 12,
            heat_sensitivity: 10.0,
            max_field_heat: 0.4,
            intensity_multiplier: 0.2,
            blur_passes: 6,
            processing: Size::new(160, 120),
            motion_sensitivity: 30.0 / 255.0,
            accumulation: 0.8,
            brightness: 1.0,
            peak_floor: 0.01,
            view_mode: ViewMode::Heatmap,
            palette: Palette::Ember,
            background: PackedRgba::rgb(10, 5, 30),
            mirror_x: true,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: EngineConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    /// Motion-heatmap preset: dense renderer, slow fade, thermal palette.
    pub fn dense() -> Self {
        Self {
            renderer: RendererKind::Dense,
            decay: 0.985,
            palette: Palette::Thermal,
            background: PackedRgba::BLACK,
            ..Self::default()
        }
    }

    /// Preset for a renderer kind.
    pub fn preset(kind: RendererKind) -> Self {
        match kind {
            RendererKind::Metaballs => Self::default(),
            RendererKind::Dense => Self::dense(),
        }
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> EngineConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config from an arbitrary key lookup.
    ///
    /// Unparseable values keep the preset value and are reported; validation
    /// errors of the resulting config are appended.
    pub fn from_env_with<F>(mut get: F) -> ConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        let mut config = match get(ENV_RENDERER) {
            Some(value) => match RendererKind::parse(&value) {
                Some(kind) => Self::preset(kind),
                None => {
                    errors.push(ConfigError::new(
                        "renderer",
                        value,
                        "expected metaballs|dense",
                    ));
                    Self::default()
                }
            },
            None => Self::default(),
        };

        {
            let mut read = |key: &str,
                            field: &'static str,
                            expected: &str,
                            slot: &mut f32,
                            errors: &mut Vec<ConfigError>| {
                if let Some(value) = get(key) {
                    match parse_f32(&value) {
                        Some(parsed) => *slot = parsed,
                        None => errors.push(ConfigError::new(field, value, expected)),
                    }
                }
            };
            read(ENV_DECAY, "decay", "expected number", &mut config.decay, &mut errors);
            read(ENV_MAX_HEAT, "max_heat", "expected number", &mut config.max_heat, &mut errors);
            read(
                ENV_INJECTION,
                "injection_intensity",
                "expected number",
                &mut config.injection_intensity,
                &mut errors,
            );
            read(
                ENV_SPREAD_RADIUS,
                "spread_radius",
                "expected number",
                &mut config.spread_radius,
                &mut errors,
            );
            read(
                ENV_CONFIDENCE_FLOOR,
                "confidence_floor",
                "expected number",
                &mut config.confidence_floor,
                &mut errors,
            );
            read(
                ENV_NOISE_FLOOR,
                "blob_noise_floor",
                "expected number",
                &mut config.blob_noise_floor,
                &mut errors,
            );
            read(
                ENV_BLOB_RADIUS,
                "blob_radius",
                "expected number",
                &mut config.blob_radius,
                &mut errors,
            );
            read(
                ENV_BLOB_THRESHOLD,
                "blob_threshold",
                "expected number",
                &mut config.blob_threshold,
                &mut errors,
            );
            read(
                ENV_SOFTENING,
                "influence_softening",
                "expected number",
                &mut config.influence_softening,
                &mut errors,
            );
            read(
                ENV_INFLUENCE_CUTOFF,
                "influence_cutoff",
                "expected number",
                &mut config.influence_cutoff,
                &mut errors,
            );
            read(
                ENV_HEAT_SENSITIVITY,
                "heat_sensitivity",
                "expected number",
                &mut config.heat_sensitivity,
                &mut errors,
            );
            read(
                ENV_MAX_FIELD_HEAT,
                "max_field_heat",
                "expected number",
                &mut config.max_field_heat,
                &mut errors,
            );
            read(
                ENV_INTENSITY_MULTIPLIER,
                "intensity_multiplier",
                "expected number",
                &mut config.intensity_multiplier,
                &mut errors,
            );
            read(
                ENV_MOTION_SENSITIVITY,
                "motion_sensitivity",
                "expected number",
                &mut config.motion_sensitivity,
                &mut errors,
            );
            read(
                ENV_ACCUMULATION,
                "accumulation",
                "expected number",
                &mut config.accumulation,
                &mut errors,
            );
            read(ENV_BRIGHTNESS, "brightness", "expected number", &mut config.brightness, &mut errors);
            read(ENV_PEAK_FLOOR, "peak_floor", "expected number", &mut config.peak_floor, &mut errors);
        }

        if let Some(value) = get(ENV_CELL_SIZE) {
            match parse_u32(&value) {
                Some(parsed) => config.cell_size = parsed,
                None => errors.push(ConfigError::new(
                    "cell_size",
                    value,
                    "expected positive integer",
                )),
            }
        }

        if let Some(value) = get(ENV_MASK_STRIDE) {
            match parse_u32(&value) {
                Some(parsed) => config.mask_stride = parsed,
                None => errors.push(ConfigError::new(
                    "mask_stride",
                    value,
                    "expected positive integer",
                )),
            }
        }

        if let Some(value) = get(ENV_MAX_BLOBS) {
            match value.trim().parse::<usize>() {
                Ok(parsed) => config.max_blobs = parsed,
                Err(_) => errors.push(ConfigError::new(
                    "max_blobs",
                    value,
                    "expected integer (0 = unbounded)",
                )),
            }
        }

        if let Some(value) = get(ENV_METABALL_STEP) {
            match parse_u32(&value) {
                Some(parsed) => config.metaball_step = parsed,
                None => errors.push(ConfigError::new(
                    "metaball_step",
                    value,
                    "expected positive integer",
                )),
            }
        }

        if let Some(value) = get(ENV_BLUR_PASSES) {
            match parse_u32(&value) {
                Some(parsed) => config.blur_passes = parsed,
                None => errors.push(ConfigError::new(
                    "blur_passes",
                    value,
                    "expected integer",
                )),
            }
        }

        if let Some(value) = get(ENV_PROCESSING_SIZE) {
            match Size::parse(&value) {
                Some(parsed) => config.processing = parsed,
                None => errors.push(ConfigError::new(
                    "processing",
                    value,
                    "expected WxH",
                )),
            }
        }

        if let Some(value) = get(ENV_VIEW_MODE) {
            match ViewMode::parse(&value) {
                Some(parsed) => config.view_mode = parsed,
                None => errors.push(ConfigError::new(
                    "view_mode",
                    value,
                    "expected heatmap|overlay|diff",
                )),
            }
        }

        if let Some(value) = get(ENV_PALETTE) {
            match Palette::parse(&value) {
                Some(parsed) => config.palette = parsed,
                None => errors.push(ConfigError::new(
                    "palette",
                    value,
                    "expected ember|thermal|cool|plasma",
                )),
            }
        }

        if let Some(value) = get(ENV_GRADIENT) {
            match ColorGradient::parse(&value) {
                Ok(gradient) => config.palette = Palette::Custom(gradient),
                Err(err) => errors.push(ConfigError::new("gradient", value, err.to_string())),
            }
        }

        if let Some(value) = get(ENV_BACKGROUND) {
            match PackedRgba::from_hex(&value) {
                Some(parsed) => config.background = parsed,
                None => errors.push(ConfigError::new(
                    "background",
                    value,
                    "expected rrggbb",
                )),
            }
        }

        if let Some(value) = get(ENV_MIRROR) {
            match parse_bool(&value) {
                Some(parsed) => config.mirror_x = parsed,
                None => errors.push(ConfigError::new(
                    "mirror_x",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Err(mut validation) = config.validate() {
            errors.append(&mut validation);
        }

        ConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if !(self.decay.is_finite() && (0.0..1.0).contains(&self.decay)) {
            errors.push(ConfigError::new(
                "decay",
                self.decay.to_string(),
                "must be in [0, 1)",
            ));
        }
        validate_positive_f32("max_heat", self.max_heat, &mut errors);
        validate_non_negative("injection_intensity", self.injection_intensity, &mut errors);
        validate_non_negative("spread_radius", self.spread_radius, &mut errors);
        validate_positive_u32("cell_size", self.cell_size, &mut errors);
        validate_unit("confidence_floor", self.confidence_floor, &mut errors);
        validate_positive_u32("mask_stride", self.mask_stride, &mut errors);
        validate_non_negative("blob_noise_floor", self.blob_noise_floor, &mut errors);
        validate_positive_f32("blob_radius", self.blob_radius, &mut errors);
        validate_positive_f32("blob_threshold", self.blob_threshold, &mut errors);
        validate_positive_f32("influence_softening", self.influence_softening, &mut errors);
        validate_non_negative("influence_cutoff", self.influence_cutoff, &mut errors);
        validate_positive_u32("metaball_step", self.metaball_step, &mut errors);
        if !(self.heat_sensitivity.is_finite() && self.heat_sensitivity > self.blob_threshold) {
            errors.push(ConfigError::new(
                "heat_sensitivity",
                self.heat_sensitivity.to_string(),
                "must be finite and greater than blob_threshold",
            ));
        }
        validate_unit("max_field_heat", self.max_field_heat, &mut errors);
        validate_non_negative("intensity_multiplier", self.intensity_multiplier, &mut errors);
        if self.processing.is_empty() {
            errors.push(ConfigError::new(
                "processing",
                self.processing.to_string(),
                "must be at least 1x1",
            ));
        }
        validate_unit("motion_sensitivity", self.motion_sensitivity, &mut errors);
        validate_non_negative("accumulation", self.accumulation, &mut errors);
        validate_positive_f32("brightness", self.brightness, &mut errors);
        validate_positive_f32("peak_floor", self.peak_floor, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// True when switching from `self` to `other` needs buffers reallocated.
    pub fn geometry_differs(&self, other: &Self) -> bool {
        self.renderer != other.renderer
            || self.cell_size != other.cell_size
            || self.processing != other.processing
    }

    /// Short human-readable summary for logs.
    #[must_use]
    pub fn summary_short(&self) -> String {
        format!(
            "{} · decay {} · {} · {} · mirror {}",
            self.renderer,
            self.decay,
            self.palette,
            self.view_mode,
            if self.mirror_x { "on" } else { "off" }
        )
    }
}

#[inline]
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[inline]
fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

#[inline]
fn parse_f32(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

fn validate_positive_u32(field: &'static str, value: u32, errors: &mut Vec<ConfigError>) {
    if value == 0 {
        errors.push(ConfigError::new(field, value.to_string(), "must be >= 1"));
    }
}

fn validate_positive_f32(field: &'static str, value: f32, errors: &mut Vec<ConfigError>) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigError::new(field, value.to_string(), "must be > 0"));
    }
}

fn validate_non_negative(field: &'static str, value: f32, errors: &mut Vec<ConfigError>) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ConfigError::new(field, value.to_string(), "must be >= 0"));
    }
}

fn validate_unit(field: &'static str, value: f32, errors: &mut Vec<ConfigError>) {
    if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
        errors.push(ConfigError::new(
            field,
            value.to_string(),
            "must be in [0, 1]",
        ));
    }
}
