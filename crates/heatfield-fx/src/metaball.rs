#![forbid(unsafe_code)]

//! Implicit-surface field over blobs.
//!
//! Each blob contributes `r^2 / (d^2 + eps)` with `r = base * (0.5 + 0.5 i)`.
//! The field sum decides visibility; the strongest single weighted
//! contribution boosts brightness near blob centers.
//!
//! Cost is `O(samples * blobs)`. Per-blob radii are computed once per frame
//! in [`MetaballField::prepare`].

use heatfield_core::{EngineConfig, Point};

use crate::blob::Blob;

/// Tunables for field evaluation and the field-to-heat remap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaballParams {
    /// Base radius in output pixels.
    pub base_radius: f32,
    /// Visibility threshold on the field sum.
    pub threshold: f32,
    /// Softening added to squared distance. Must be > 0.
    pub softening: f32,
    /// Single-blob influence needed to count towards `max_weighted`.
    pub cutoff: f32,
    /// Field sum that maps to `max_field_heat`.
    pub sensitivity: f32,
    pub max_field_heat: f32,
    pub intensity_multiplier: f32,
}

impl Default for MetaballParams {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl MetaballParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            base_radius: config.blob_radius,
            threshold: config.blob_threshold,
            softening: config.influence_softening,
            cutoff: config.influence_cutoff,
            sensitivity: config.heat_sensitivity,
            max_field_heat: config.max_field_heat,
            intensity_multiplier: config.intensity_multiplier,
        }
    }
}

/// Field value at one sample point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldSample {
    /// Sum of all influences.
    pub sum: f32,
    /// `max(intensity * influence)` over blobs with influence above the cutoff.
    pub max_weighted: f32,
}

#[derive(Debug, Clone, Copy)]
struct CachedBlob {
    center: Point,
    r2: f32,
    intensity: f32,
}

/// Metaball evaluator with a per-frame blob cache.
#[derive(Debug, Clone, Default)]
pub struct MetaballField {
    params: MetaballParams,
    cache: Vec<CachedBlob>,
}

impl MetaballField {
    pub fn new(params: MetaballParams) -> Self {
        Self {
            params,
            cache: Vec::new(),
        }
    }

    #[inline]
    pub fn params(&self) -> &MetaballParams {
        &self.params
    }

    pub fn set_params(&mut self, params: MetaballParams) {
        self.params = params;
    }

    /// Radius of a blob with normalized intensity `i`: between 0.5x and 1x base.
    #[inline]
    pub fn effective_radius(&self, intensity: f32) -> f32 {
        self.params.base_radius * (0.5 + 0.5 * intensity)
    }

    #[inline]
    pub fn influence(&self, dist_sq: f32, radius: f32) -> f32 {
        radius * radius / (dist_sq + self.params.softening)
    }

    /// Cache per-blob squared radii for the coming sweep.
    pub fn prepare(&mut self, blobs: &[Blob]) {
        self.cache.clear();
        self.cache.reserve(blobs.len());
        for b in blobs {
            let r = self.effective_radius(b.intensity);
            self.cache.push(CachedBlob {
                center: b.position,
                r2: r * r,
                intensity: b.intensity,
            });
        }
    }

    /// Number of blobs currently cached.
    #[inline]
    pub fn blob_count(&self) -> usize {
        self.cache.len()
    }

    /// Evaluate the field at `p` against the prepared blobs.
    pub fn sample(&self, p: Point) -> FieldSample {
        let eps = self.params.softening;
        let cutoff = self.params.cutoff;
        let mut sum = 0.0f32;
        let mut max_weighted = 0.0f32;
        for b in &self.cache {
            let influence = b.r2 / (p.dist_sq(b.center) + eps);
            sum += influence;
            if influence > cutoff {
                max_weighted = max_weighted.max(b.intensity * influence);
            }
        }
        FieldSample { sum, max_weighted }
    }

    /// Normalized heat for a sample, or `None` when it is at or below the
    /// visibility threshold.
    ///
    /// `[threshold, sensitivity]` maps linearly to `[0, max_field_heat]`; the
    /// dominant-blob boost is added and the result clamped to `[0, 1]`. Very
    /// dense scenes push the sum far past `sensitivity` and saturate at 1.
    pub fn heat(&self, s: FieldSample) -> Option<f32> {
        let p = &self.params;
        if s.sum.is_nan() || s.sum <= p.threshold {
            return None;
        }
        let span = p.sensitivity - p.threshold;
        let field = if span > 0.0 {
            (s.sum - p.threshold) / span * p.max_field_heat
        } else {
            p.max_field_heat
        };
        let boosted = field + s.max_weighted * p.intensity_multiplier;
        Some(if boosted.is_nan() { 0.0 } else { boosted.clamp(0.0, 1.0) })
    }

    /// `sample` followed by `heat`.
    #[inline]
    pub fn heat_at(&self, p: Point) -> Option<f32> {
        self.heat(self.sample(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(x: f32, y: f32, intensity: f32) -> Blob {
        Blob {
            position: Point::new(x, y),
            intensity,
        }
    }

    fn field(blobs: &[Blob]) -> MetaballField {
        let mut f = MetaballField::new(MetaballParams::default());
        f.prepare(blobs);
        f
    }

    #[test]
    fn radius_scales_with_intensity() {
        let f = field(&[]);
        assert_eq!(f.effective_radius(0.0), 22.5);
        assert_eq!(f.effective_radius(1.0), 45.0);
    }

    #[test]
    fn blob_center_is_always_inside() {
        for intensity in [0.0, 0.04, 0.5, 1.0] {
            let f = field(&[blob(100.0, 100.0, intensity)]);
            let s = f.sample(Point::new(100.0, 100.0));
            let r = f.effective_radius(intensity);
            assert_eq!(s.sum, f.influence(0.0, r));
            assert!(s.sum > f.params().threshold, "intensity {intensity}");
            assert!(f.heat(s).is_some());
        }
    }

    #[test]
    fn sample_sums_squared_distance_influence() {
        let a = blob(10.0, 10.0, 1.0);
        let b = blob(40.0, 50.0, 0.5);
        let f = field(&[a, b]);
        let p = Point::new(13.0, 14.0);
        let expected = f.influence(p.dist_sq(a.position), f.effective_radius(1.0))
            + f.influence(p.dist_sq(b.position), f.effective_radius(0.5));
        assert!((f.sample(p).sum - expected).abs() < 1e-5);
    }

    #[test]
    fn far_point_is_background() {
        let f = field(&[blob(0.0, 0.0, 1.0)]);
        assert_eq!(f.heat_at(Point::new(1000.0, 1000.0)), None);
    }

    #[test]
    fn no_blobs_no_field() {
        let f = field(&[]);
        assert_eq!(f.sample(Point::new(5.0, 5.0)), FieldSample::default());
        assert_eq!(f.heat_at(Point::new(5.0, 5.0)), None);
    }

    #[test]
    fn sum_is_order_independent() {
        let a = blob(10.0, 20.0, 0.3);
        let b = blob(50.0, 25.0, 0.9);
        let c = blob(30.0, 60.0, 0.6);
        let p = Point::new(33.0, 33.0);
        let s1 = field(&[a, b, c]).sample(p);
        let s2 = field(&[c, a, b]).sample(p);
        assert!((s1.sum - s2.sum).abs() < 1e-5);
        assert_eq!(s1.max_weighted, s2.max_weighted);
    }

    #[test]
    fn weak_influence_does_not_boost() {
        // Influence at 500 px: 2025 / 250100 < 0.1.
        let f = field(&[blob(0.0, 0.0, 1.0)]);
        let s = f.sample(Point::new(500.0, 0.0));
        assert!(s.sum > 0.0);
        assert_eq!(s.max_weighted, 0.0);
    }

    #[test]
    fn remap_matches_formula() {
        let f = field(&[]);
        let s = FieldSample {
            sum: 5.4,
            max_weighted: 1.0,
        };
        // (5.4 - 0.8) / (10 - 0.8) * 0.4 + 1.0 * 0.2 = 0.4
        let h = f.heat(s).unwrap();
        assert!((h - 0.4).abs() < 1e-6, "{h}");
    }

    #[test]
    fn threshold_is_exclusive() {
        let f = field(&[]);
        let at = FieldSample {
            sum: 0.8,
            max_weighted: 0.0,
        };
        assert_eq!(f.heat(at), None);
    }

    #[test]
    fn dense_scene_saturates_at_one() {
        // Known saturation boundary: many overlapping hot blobs push the sum
        // far past the sensitivity ceiling and the heat clips to 1.0.
        let blobs: Vec<_> = (0..200).map(|i| blob((i % 20) as f32, (i / 20) as f32, 1.0)).collect();
        let f = field(&blobs);
        let s = f.sample(Point::new(10.0, 5.0));
        assert!(s.sum > 10.0 * f.params().sensitivity);
        assert_eq!(f.heat(s), Some(1.0));
    }

    #[test]
    fn prepare_replaces_cache() {
        let mut f = field(&[blob(0.0, 0.0, 1.0), blob(1.0, 1.0, 1.0)]);
        assert_eq!(f.blob_count(), 2);
        f.prepare(&[]);
        assert_eq!(f.blob_count(), 0);
    }
}
