#![forbid(unsafe_code)]

//! Normalized heat to pixel color.

use heatfield_core::{EngineConfig, PackedRgba, Palette, ViewMode};

/// Underlay dimming in overlay mode.
pub const OVERLAY_DIM: f32 = 0.4;
/// Overlay alpha gain: `alpha = clamp(v * OVERLAY_GAIN, 0, 1)`.
pub const OVERLAY_GAIN: f32 = 1.8;

/// Palette plus view mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapper {
    palette: Palette,
    view_mode: ViewMode,
    background: PackedRgba,
}

impl ColorMapper {
    pub fn new(palette: Palette, view_mode: ViewMode, background: PackedRgba) -> Self {
        Self {
            palette,
            view_mode,
            background,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.palette.clone(), config.view_mode, config.background)
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[inline]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    #[inline]
    pub fn background(&self) -> PackedRgba {
        self.background
    }

    /// Color for normalized heat `v` in `[0, 1]`.
    ///
    /// `underlay` is the camera pixel behind this point, used only by
    /// [`ViewMode::Overlay`]; without one the background shows through.
    #[inline]
    pub fn map(&self, v: f32, underlay: Option<PackedRgba>) -> PackedRgba {
        let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        match self.view_mode {
            ViewMode::Heatmap => self.palette.color_at(v),
            ViewMode::Diff => PackedRgba::gray((v * 255.0).round() as u8),
            ViewMode::Overlay => {
                let base = underlay.map_or(self.background, |c| c.dimmed(OVERLAY_DIM));
                base.lerp(self.palette.color_at(v), v * OVERLAY_GAIN)
            }
        }
    }
}

/// Scale a dense value by the frame peak: `v / max(peak, floor) * brightness`,
/// clamped to `[0, 1]`.
#[inline]
pub fn normalize(value: f32, peak: f32, floor: f32, brightness: f32) -> f32 {
    let n = value / peak.max(floor) * brightness;
    if n.is_nan() { 0.0 } else { n.clamp(0.0, 1.0) }
}
