#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! All output coordinates are in raster pixels with the origin at the
//! top-left corner. Input adapters deliver coordinates in their own source
//! space; [`SourceMapping`] carries them into output space.

use std::fmt;

/// Pixel dimensions of a raster, grid or input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width in pixels (or cells).
    pub width: u32,
    /// Height in pixels (or cells).
    pub height: u32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of elements (`width * height`).
    #[inline]
    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whole cells of `cell_size` pixels along each axis (`floor(size / cell_size)`).
    ///
    /// A zero cell size yields an empty grid.
    #[inline]
    pub const fn cells(self, cell_size: u32) -> Self {
        if cell_size == 0 {
            return Self::new(0, 0);
        }
        Self::new(self.width / cell_size, self.height / cell_size)
    }

    /// Parse `"WxH"` (also accepts `X` and `*` as separator).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (w, h) = value
            .split_once(['x', 'X', '*'])
            .map(|(w, h)| (w.trim(), h.trim()))?;
        Some(Self::new(w.parse().ok()?, h.parse().ok()?))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A point in output-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    pub fn dist_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// How a source image is fitted onto the output raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FitMode {
    /// Scale each axis independently so the source fills the output exactly.
    #[default]
    Stretch,
    /// Scale uniformly so the source covers the output, centered; overflow is cropped.
    Cover,
}

/// Affine mapping from source-image coordinates to output pixels.
///
/// Mirroring is applied after scaling, about the output's vertical center
/// line (`x' = output_width - x`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMapping {
    scale_x: f32,
    scale_y: f32,
    offset_x: f32,
    offset_y: f32,
    output_width: f32,
    mirror_x: bool,
}

impl SourceMapping {
    /// Build the mapping for a `source` image shown on an `output` raster.
    ///
    /// An empty source maps every point to the origin (before mirroring).
    pub fn new(source: Size, output: Size, fit: FitMode, mirror_x: bool) -> Self {
        let output_width = output.width as f32;
        if source.is_empty() {
            return Self {
                scale_x: 0.0,
                scale_y: 0.0,
                offset_x: 0.0,
                offset_y: 0.0,
                output_width,
                mirror_x,
            };
        }

        let sx = output.width as f32 / source.width as f32;
        let sy = output.height as f32 / source.height as f32;
        let (scale_x, scale_y, offset_x, offset_y) = match fit {
            FitMode::Stretch => (sx, sy, 0.0, 0.0),
            FitMode::Cover => {
                let scale = sx.max(sy);
                let ox = (output.width as f32 - source.width as f32 * scale) / 2.0;
                let oy = (output.height as f32 - source.height as f32 * scale) / 2.0;
                (scale, scale, ox, oy)
            }
        };

        Self {
            scale_x,
            scale_y,
            offset_x,
            offset_y,
            output_width,
            mirror_x,
        }
    }

    /// Map a source coordinate to output pixels.
    #[inline]
    pub fn map(&self, x: f32, y: f32) -> Point {
        let mut px = x * self.scale_x + self.offset_x;
        let py = y * self.scale_y + self.offset_y;
        if self.mirror_x {
            px = self.output_width - px;
        }
        Point::new(px, py)
    }

    /// Horizontal and vertical scale factors.
    #[inline]
    pub fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }
}
