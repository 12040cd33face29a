#![forbid(unsafe_code)]

//! Energy samples delivered by input adapters.
//!
//! Adapters (pose inference, segmentation, camera capture) run on their own
//! schedule and hand complete batches to the engine through a
//! [`SampleSlot`]. A batch is never merged with its predecessor: the most
//! recent publish wins and older unconsumed batches are dropped.

use std::sync::{Arc, Mutex, PoisonError};

use crate::geometry::{FitMode, Size};

/// One detected body landmark in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Keypoint {
    #[inline]
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// The keypoints of one detected person.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }
}

/// All poses from a single detection cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeypointFrame {
    /// Dimensions of the image the detector ran on.
    pub source: Size,
    pub fit: FitMode,
    pub poses: Vec<Pose>,
}

impl KeypointFrame {
    pub fn new(source: Size, poses: Vec<Pose>) -> Self {
        Self {
            source,
            fit: FitMode::Stretch,
            poses,
        }
    }

    /// Iterate all keypoints across poses.
    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.poses.iter().flat_map(|p| p.keypoints.iter())
    }
}

/// Per-pixel person mask, row-major, nonzero = occupied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OccupancyMask {
    pub size: Size,
    pub fit: FitMode,
    pub data: Vec<u8>,
}

impl OccupancyMask {
    /// Mask fitted with [`FitMode::Cover`], as segmentation output is.
    pub fn new(size: Size, data: Vec<u8>) -> Self {
        Self {
            size,
            fit: FitMode::Cover,
            data,
        }
    }

    /// Buffer length matches `width * height`.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.size.area()
    }

    /// Occupancy at `(x, y)`; out of range reads as empty.
    #[inline]
    pub fn is_occupied(&self, x: u32, y: u32) -> bool {
        if x >= self.size.width || y >= self.size.height {
            return false;
        }
        let idx = y as usize * self.size.width as usize + x as usize;
        self.data.get(idx).is_some_and(|&v| v != 0)
    }
}

/// A raw RGBA camera frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoFrame {
    pub size: Size,
    /// Row-major RGBA bytes, `4 * width * height` long.
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn new(size: Size, rgba: Vec<u8>) -> Self {
        Self { size, rgba }
    }

    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.rgba.len() == self.size.area() * 4
    }

    /// RGB bytes of the pixel at `(x, y)`. Caller guarantees bounds.
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2]]
    }
}

/// One complete input batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleSet {
    Keypoints(KeypointFrame),
    Mask(OccupancyMask),
    Video(VideoFrame),
}

impl SampleSet {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Keypoints(_) => "keypoints",
            Self::Mask(_) => "mask",
            Self::Video(_) => "video",
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    latest: Option<SampleSet>,
    published: u64,
}

/// Latest-wins handoff between an adapter thread and the engine.
///
/// Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct SampleSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl SampleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is pending with `set`.
    pub fn publish(&self, set: SampleSet) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.latest = Some(set);
        state.published += 1;
        crate::trace!(
            kind = state.latest.as_ref().map_or("none", SampleSet::kind),
            published = state.published,
            "sample published"
        );
    }

    /// Take the pending set, leaving the slot empty.
    pub fn take(&self) -> Option<SampleSet> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .take()
    }

    /// Total number of publishes so far, consumed or not.
    pub fn published_count(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(w: u32, h: u32, fill: u8) -> SampleSet {
        SampleSet::Mask(OccupancyMask::new(
            Size::new(w, h),
            vec![fill; (w * h) as usize],
        ))
    }

    #[test]
    fn publish_replaces_pending_set() {
        let slot = SampleSlot::new();
        slot.publish(mask(2, 2, 0));
        slot.publish(mask(4, 4, 1));
        assert_eq!(slot.published_count(), 2);
        assert_eq!(slot.take(), Some(mask(4, 4, 1)));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn clones_share_state() {
        let producer = SampleSlot::new();
        let consumer = producer.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..10u8 {
                producer.publish(mask(1, 1, i));
            }
        });
        handle.join().unwrap();
        assert_eq!(consumer.published_count(), 10);
        assert_eq!(consumer.take(), Some(mask(1, 1, 9)));
    }

    #[test]
    fn mask_bounds_and_shape() {
        let m = OccupancyMask::new(Size::new(3, 2), vec![0, 1, 0, 0, 0, 7]);
        assert!(m.is_well_formed());
        assert!(m.is_occupied(1, 0));
        assert!(m.is_occupied(2, 1));
        assert!(!m.is_occupied(0, 0));
        assert!(!m.is_occupied(3, 0));
        assert!(!m.is_occupied(0, 2));
        assert_eq!(m.fit, FitMode::Cover);

        let short = OccupancyMask::new(Size::new(3, 2), vec![1; 5]);
        assert!(!short.is_well_formed());
    }

    #[test]
    fn keypoints_flatten_across_poses() {
        let frame = KeypointFrame::new(
            Size::new(640, 480),
            vec![
                Pose::new(vec![Keypoint::new(1.0, 2.0, 0.9)]),
                Pose::new(vec![Keypoint::new(3.0, 4.0, 0.5), Keypoint::new(5.0, 6.0, 0.2)]),
            ],
        );
        assert_eq!(frame.keypoints().count(), 3);
        assert_eq!(frame.fit, FitMode::Stretch);
    }

    #[test]
    fn video_frame_shape() {
        let v = VideoFrame::new(Size::new(2, 1), vec![1, 2, 3, 255, 4, 5, 6, 255]);
        assert!(v.is_well_formed());
        assert_eq!(v.rgb_at(1, 0), [4, 5, 6]);
        assert!(!VideoFrame::new(Size::new(2, 2), vec![0; 8]).is_well_formed());
    }
}
