#![forbid(unsafe_code)]

//! Per-pixel energy buffer at processing resolution.
//!
//! The peak is tracked through decay and every deposit, before any blur,
//! and is what the renderer normalizes against.

use heatfield_core::Size;

use crate::decay::TemporalDecay;
use crate::smoother::SpatialSmoother;

#[derive(Debug, Clone, Default)]
pub struct DecayBuffer {
    size: Size,
    max_heat: f32,
    values: Vec<f32>,
    peak: f32,
}

impl DecayBuffer {
    pub fn new(size: Size, max_heat: f32) -> Self {
        Self {
            size,
            max_heat: max_heat.max(0.0),
            values: vec![0.0; size.area()],
            peak: 0.0,
        }
    }

    /// Reallocate and zero-fill.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.values.clear();
        self.values.resize(size.area(), 0.0);
        self.peak = 0.0;
    }

    pub fn set_max_heat(&mut self, max_heat: f32) {
        self.max_heat = max_heat.max(0.0);
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Largest value seen since the last decay.
    #[inline]
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Decay and cap every value; resets the peak to the post-decay maximum.
    pub fn decay(&mut self, decay: TemporalDecay) {
        let cap = self.max_heat;
        let mut peak = 0.0f32;
        for v in &mut self.values {
            *v = decay.apply(*v).min(cap);
            peak = peak.max(*v);
        }
        self.peak = peak;
    }

    /// Add `amount` at `(x, y)`, capped. Out of range is ignored.
    #[inline]
    pub fn add(&mut self, x: i32, y: i32, amount: f32) -> bool {
        if x < 0 || y < 0 || x as u32 >= self.size.width || y as u32 >= self.size.height {
            return false;
        }
        let i = y as usize * self.size.width as usize + x as usize;
        self.add_index(i, amount);
        true
    }

    /// Add `amount` at a row-major index, capped.
    #[inline]
    pub fn add_index(&mut self, i: usize, amount: f32) {
        if !(amount.is_finite() && amount > 0.0) {
            return;
        }
        if let Some(v) = self.values.get_mut(i) {
            *v = (*v + amount).min(self.max_heat);
            self.peak = self.peak.max(*v);
        }
    }

    /// Diffuse in place. The tracked peak is left as it was before blurring.
    pub fn smooth(&mut self, smoother: &mut SpatialSmoother, passes: u32) {
        smoother.smooth(&mut self.values, self.size, passes);
    }

    /// Number of values above `floor`.
    pub fn active_cells(&self, floor: f32) -> usize {
        self.values.iter().filter(|&&v| v > floor).count()
    }

    pub fn clear(&mut self) {
        self.values.fill(0.0);
        self.peak = 0.0;
    }
}
