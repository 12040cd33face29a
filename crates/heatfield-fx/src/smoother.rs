#![forbid(unsafe_code)]

//! Iterative 5-point blur for the dense buffer.
//!
//! Kernel: center 0.4, each direct neighbour 0.15. A neighbour outside the
//! buffer reads as the center value. Every pass reads the previous pass and
//! writes a scratch buffer which is then swapped in, so there is no
//! directional bias.

use heatfield_core::Size;

pub const CENTER_WEIGHT: f32 = 0.4;
pub const NEIGHBOR_WEIGHT: f32 = 0.15;

/// Blur with an owned scratch buffer reused across frames.
#[derive(Debug, Clone, Default)]
pub struct SpatialSmoother {
    scratch: Vec<f32>,
}

impl SpatialSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `passes` blur passes over `values` (row-major, `size` shaped).
    ///
    /// A buffer whose length does not match `size` is left untouched.
    pub fn smooth(&mut self, values: &mut Vec<f32>, size: Size, passes: u32) {
        let (w, h) = (size.width as usize, size.height as usize);
        if passes == 0 || w == 0 || h == 0 || values.len() != w * h {
            return;
        }
        self.scratch.resize(values.len(), 0.0);
        for _ in 0..passes {
            blur_pass(values, &mut self.scratch, w, h);
            std::mem::swap(values, &mut self.scratch);
        }
    }

    /// Scratch capacity, for allocation checks.
    #[inline]
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }
}

fn blur_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize) {
    for y in 0..h {
        let row = y * w;
        for x in 0..w {
            let i = row + x;
            let c = src[i];
            let left = if x > 0 { src[i - 1] } else { c };
            let right = if x + 1 < w { src[i + 1] } else { c };
            let up = if y > 0 { src[i - w] } else { c };
            let down = if y + 1 < h { src[i + w] } else { c };
            dst[i] = c * CENTER_WEIGHT + (left + right + up + down) * NEIGHBOR_WEIGHT;
        }
    }
}
