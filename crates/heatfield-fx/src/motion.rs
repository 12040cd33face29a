#![forbid(unsafe_code)]

//! Frame-differencing motion detector.
//!
//! Each RGBA frame is area-averaged down to the detector's resolution and
//! reduced to Rec. 601 luminance in `[0, 1]`. A cell whose luminance moved
//! by more than `sensitivity` since the previous frame yields
//! `(diff - sensitivity) * gain`. The first frame after a resize only primes
//! the history.

use heatfield_core::{Size, VideoFrame, color::luma};

#[derive(Debug, Clone, Default)]
pub struct MotionDetector {
    size: Size,
    previous: Vec<f32>,
    current: Vec<f32>,
    energy: Vec<f32>,
    primed: bool,
}

impl MotionDetector {
    pub fn new(size: Size) -> Self {
        let mut detector = Self::default();
        detector.resize(size);
        detector
    }

    /// Change resolution and forget history.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.previous.clear();
        self.previous.resize(size.area(), 0.0);
        self.current.clear();
        self.current.resize(size.area(), 0.0);
        self.energy.clear();
        self.energy.resize(size.area(), 0.0);
        self.primed = false;
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Luminance of the most recent frame at detector resolution.
    #[inline]
    pub fn luminance(&self) -> &[f32] {
        &self.previous
    }

    /// Feed one frame. Returns per-cell motion energy, or `None` while
    /// priming or when the frame buffer is malformed.
    pub fn process(
        &mut self,
        frame: &VideoFrame,
        sensitivity: f32,
        gain: f32,
    ) -> Option<&[f32]> {
        if !frame.is_well_formed() || frame.size.is_empty() || self.size.is_empty() {
            return None;
        }
        downsample_luma(frame, self.size, &mut self.current);
        std::mem::swap(&mut self.current, &mut self.previous);
        if !self.primed {
            self.primed = true;
            return None;
        }
        // `previous` now holds this frame, `current` the one before.
        for ((e, &now), &before) in self
            .energy
            .iter_mut()
            .zip(&self.previous)
            .zip(&self.current)
        {
            let diff = (now - before).abs();
            *e = if diff > sensitivity {
                (diff - sensitivity) * gain
            } else {
                0.0
            };
        }
        Some(self.energy.as_slice())
    }
}

/// Area-average `frame` to `target` and store luminance in `out`.
pub fn downsample_luma(frame: &VideoFrame, target: Size, out: &mut Vec<f32>) {
    out.clear();
    out.resize(target.area(), 0.0);
    let (sw, sh) = (frame.size.width as u64, frame.size.height as u64);
    let (tw, th) = (target.width as u64, target.height as u64);
    if sw == 0 || sh == 0 || tw == 0 || th == 0 || !frame.is_well_formed() {
        return;
    }
    for ty in 0..th {
        let y0 = ty * sh / th;
        let y1 = ((ty + 1) * sh / th).max(y0 + 1).min(sh);
        for tx in 0..tw {
            let x0 = tx * sw / tw;
            let x1 = ((tx + 1) * sw / tw).max(x0 + 1).min(sw);
            let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
            for y in y0..y1 {
                for x in x0..x1 {
                    let [pr, pg, pb] = frame.rgb_at(x as u32, y as u32);
                    r += pr as u64;
                    g += pg as u64;
                    b += pb as u64;
                }
            }
            let n = (y1 - y0) * (x1 - x0);
            let avg = |c: u64| ((c + n / 2) / n) as u8;
            out[(ty * tw + tx) as usize] = luma(avg(r), avg(g), avg(b));
        }
    }
}
