#![forbid(unsafe_code)]

//! Bilinear resampling of the low-resolution processing grid.
//!
//! Output pixel `px` maps to grid coordinate `px / out_w * (W - 1)`, so the
//! first and last grid columns land on the output edges. Per-axis lookup
//! tables are rebuilt only when either size changes.

use heatfield_core::Size;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    i0: u32,
    i1: u32,
    t: f32,
}

impl Tap {
    #[inline]
    fn at(coord: f32, len: u32) -> Self {
        let max = len.saturating_sub(1);
        let i0 = (coord.max(0.0).floor() as u32).min(max);
        let i1 = (i0 + 1).min(max);
        Self {
            i0,
            i1,
            t: (coord - i0 as f32).clamp(0.0, 1.0),
        }
    }
}

/// Sample a row-major grid at fractional coordinates `(fx, fy)`.
///
/// At integer coordinates the cell value is returned unchanged.
pub fn sample_bilinear(values: &[f32], size: Size, fx: f32, fy: f32) -> f32 {
    if size.is_empty() || values.len() != size.area() {
        return 0.0;
    }
    let tx = Tap::at(fx, size.width);
    let ty = Tap::at(fy, size.height);
    blend(values, size.width as usize, tx, ty)
}

#[inline]
fn blend(values: &[f32], stride: usize, tx: Tap, ty: Tap) -> f32 {
    let r0 = ty.i0 as usize * stride;
    let r1 = ty.i1 as usize * stride;
    let v00 = values[r0 + tx.i0 as usize];
    let v10 = values[r0 + tx.i1 as usize];
    let v01 = values[r1 + tx.i0 as usize];
    let v11 = values[r1 + tx.i1 as usize];
    let top = v00 + (v10 - v00) * tx.t;
    let bottom = v01 + (v11 - v01) * tx.t;
    top + (bottom - top) * ty.t
}

/// Upsampler with cached per-axis taps.
#[derive(Debug, Clone, Default)]
pub struct BilinearUpsampler {
    source: Size,
    output: Size,
    x_taps: Vec<Tap>,
    y_taps: Vec<Tap>,
}

impl BilinearUpsampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the tap tables if either size changed.
    pub fn prepare(&mut self, source: Size, output: Size) {
        if source == self.source && output == self.output && !self.x_taps.is_empty() {
            return;
        }
        self.source = source;
        self.output = output;
        fill_taps(&mut self.x_taps, source.width, output.width);
        fill_taps(&mut self.y_taps, source.height, output.height);
    }

    /// Interpolated value for output pixel `(ox, oy)`.
    ///
    /// Call [`prepare`](Self::prepare) first; out-of-range pixels or a
    /// mismatched buffer read as 0.
    #[inline]
    pub fn value(&self, values: &[f32], ox: u32, oy: u32) -> f32 {
        let (Some(&tx), Some(&ty)) = (
            self.x_taps.get(ox as usize),
            self.y_taps.get(oy as usize),
        ) else {
            return 0.0;
        };
        if values.len() != self.source.area() || self.source.is_empty() {
            return 0.0;
        }
        blend(values, self.source.width as usize, tx, ty)
    }

    /// Resample the whole grid into `out` (row-major, output-shaped).
    pub fn upsample_into(&mut self, values: &[f32], source: Size, output: Size, out: &mut Vec<f32>) {
        self.prepare(source, output);
        out.clear();
        out.reserve(output.area());
        for oy in 0..output.height {
            for ox in 0..output.width {
                out.push(self.value(values, ox, oy));
            }
        }
    }
}

fn fill_taps(taps: &mut Vec<Tap>, source_len: u32, output_len: u32) {
    taps.clear();
    if source_len == 0 || output_len == 0 {
        return;
    }
    let span = (source_len - 1) as f32;
    let out = output_len as f32;
    taps.extend((0..output_len).map(|p| Tap::at(p as f32 / out * span, source_len)));
}
