#![forbid(unsafe_code)]

//! Packed RGBA color and luminance helpers.

use std::fmt;

/// A 32-bit RGBA color packed as `0xRRGGBBAA`.
///
/// Rasters produced by the engine are always opaque; alpha exists so the
/// buffer can be handed to presentation layers that expect four channels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct PackedRgba(pub u32);

impl PackedRgba {
    /// Fully transparent (alpha = 0).
    pub const TRANSPARENT: Self = Self(0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create an opaque RGB color (alpha = 255).
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Create an RGBA color with explicit alpha.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    /// Opaque gray with all channels set to `v`.
    #[inline]
    pub const fn gray(v: u8) -> Self {
        Self::rgb(v, v, v)
    }

    /// Red channel.
    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Green channel.
    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Blue channel.
    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Alpha channel.
    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }

    /// Channels as `[r, g, b, a]` bytes.
    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), self.a()]
    }

    /// Per-channel linear interpolation towards `other`, rounded to nearest.
    ///
    /// `t` is clamped to `[0, 1]`; `t == 0` returns `self` and `t == 1`
    /// returns `other` exactly. The result is opaque.
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        Self::rgb(
            lerp_channel(self.r(), other.r(), t),
            lerp_channel(self.g(), other.g(), t),
            lerp_channel(self.b(), other.b(), t),
        )
    }

    /// Scale RGB channels by `factor` (clamped to `[0, 1]`), keeping it opaque.
    #[inline]
    pub fn dimmed(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self::rgb(
            (self.r() as f32 * f) as u8,
            (self.g() as f32 * f) as u8,
            (self.b() as f32 * f) as u8,
        )
    }

    /// Parse `"rrggbb"` or `"#rrggbb"` hex into an opaque color.
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }

    /// Perceptual luminance in `[0, 1]` using the Rec. 601 weights.
    #[inline]
    pub fn luma(self) -> f32 {
        luma(self.r(), self.g(), self.b())
    }
}

impl fmt::Debug for PackedRgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({}, {}, {}, {})",
            self.r(),
            self.g(),
            self.b(),
            self.a()
        )
    }
}

#[inline]
fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    let a = a as f32;
    let b = b as f32;
    (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
}

/// Perceived brightness of an 8-bit RGB triple, normalized to `[0, 1]`.
///
/// Uses `0.299 R + 0.587 G + 0.114 B`.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 * 0.299 + g as f32 * 0.587 + b as f32 * 0.114) / 255.0
}
