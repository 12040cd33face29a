#![forbid(unsafe_code)]

//! Multiplicative per-frame fade shared by both renderers.

use heatfield_core::EngineConfig;

/// Decay factor plus the cap applied right after it.
///
/// `factor` 0 clears everything each frame; values near 1 keep a long
/// memory. Results are always within `[0, cap]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalDecay {
    factor: f32,
    cap: f32,
}

impl TemporalDecay {
    /// Out-of-range inputs are clamped: `factor` into `[0, 1]`, `cap` to `>= 0`.
    pub fn new(factor: f32, cap: f32) -> Self {
        let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        let cap = if cap.is_nan() { 0.0 } else { cap.max(0.0) };
        Self { factor, cap }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.decay, config.max_heat)
    }

    #[inline]
    pub const fn factor(self) -> f32 {
        self.factor
    }

    #[inline]
    pub const fn cap(self) -> f32 {
        self.cap
    }

    /// Decay one value and clamp it into `[0, cap]`.
    #[inline]
    pub fn apply(self, value: f32) -> f32 {
        let v = value * self.factor;
        if v.is_nan() { 0.0 } else { v.clamp(0.0, self.cap) }
    }

    /// Decay every value in place and return the largest result.
    pub fn apply_all(self, values: &mut [f32]) -> f32 {
        let mut peak = 0.0f32;
        for v in values.iter_mut() {
            *v = self.apply(*v);
            peak = peak.max(*v);
        }
        peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_each_frame() {
        let d = TemporalDecay::new(0.5, 50.0);
        let mut v = 40.0;
        let mut seen = Vec::new();
        for _ in 0..3 {
            v = d.apply(v);
            seen.push(v);
        }
        assert_eq!(seen, vec![20.0, 10.0, 5.0]);
    }

    #[test]
    fn result_is_capped_and_non_negative() {
        let d = TemporalDecay::new(0.9, 50.0);
        assert_eq!(d.apply(1000.0), 50.0);
        assert_eq!(d.apply(-3.0), 0.0);
        assert_eq!(d.apply(f32::NAN), 0.0);
        assert_eq!(d.apply(f32::INFINITY), 50.0);
    }

    #[test]
    fn zero_factor_clears() {
        let d = TemporalDecay::new(0.0, 50.0);
        let mut values = [3.0, 50.0, 0.5];
        assert_eq!(d.apply_all(&mut values), 0.0);
        assert_eq!(values, [0.0; 3]);
    }

    #[test]
    fn apply_all_reports_peak() {
        let d = TemporalDecay::new(0.5, 10.0);
        let mut values = [4.0, 30.0, 8.0];
        assert_eq!(d.apply_all(&mut values), 10.0);
        assert_eq!(values, [2.0, 10.0, 4.0]);
    }

    #[test]
    fn constructor_sanitizes() {
        let d = TemporalDecay::new(1.7, -2.0);
        assert_eq!(d.factor(), 1.0);
        assert_eq!(d.cap(), 0.0);
        assert_eq!(TemporalDecay::new(f32::NAN, 1.0).factor(), 0.0);
    }

    #[test]
    fn from_config_reads_decay_and_cap() {
        let d = TemporalDecay::from_config(&EngineConfig::dense());
        assert_eq!(d.factor(), 0.985);
        assert_eq!(d.cap(), 50.0);
    }
}
