#![forbid(unsafe_code)]

//! Full-resolution output raster.

use heatfield_core::{PackedRgba, Size};

/// Row-major opaque pixels at output resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Raster {
    size: Size,
    pixels: Vec<PackedRgba>,
}

impl Raster {
    pub fn new(size: Size, fill: PackedRgba) -> Self {
        Self {
            size,
            pixels: vec![fill; size.area()],
        }
    }

    /// Reallocate to `size`, filled with `fill`.
    pub fn resize(&mut self, size: Size, fill: PackedRgba) {
        self.size = size;
        self.pixels.clear();
        self.pixels.resize(size.area(), fill);
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn pixels(&self) -> &[PackedRgba] {
        &self.pixels
    }

    pub fn clear(&mut self, color: PackedRgba) {
        self.pixels.fill(color);
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<PackedRgba> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(self.pixels[y as usize * self.size.width as usize + x as usize])
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: PackedRgba) {
        if x < self.size.width && y < self.size.height {
            self.pixels[y as usize * self.size.width as usize + x as usize] = color;
        }
    }

    /// Fill a `w x h` block at `(x, y)`, clipped to the raster.
    pub fn fill_block(&mut self, x: u32, y: u32, w: u32, h: u32, color: PackedRgba) {
        let x1 = x.saturating_add(w).min(self.size.width);
        let y1 = y.saturating_add(h).min(self.size.height);
        if x >= x1 || y >= y1 {
            return;
        }
        let stride = self.size.width as usize;
        for row in y..y1 {
            let start = row as usize * stride;
            self.pixels[start + x as usize..start + x1 as usize].fill(color);
        }
    }

    /// True if every pixel has alpha 255.
    pub fn is_opaque(&self) -> bool {
        self.pixels.iter().all(|p| p.a() == 255)
    }

    /// Flatten to `[r, g, b, a, ...]` bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            out.extend_from_slice(&p.to_array());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_block_clips() {
        let mut r = Raster::new(Size::new(5, 4), PackedRgba::BLACK);
        let red = PackedRgba::rgb(255, 0, 0);
        r.fill_block(3, 2, 12, 12, red);
        assert_eq!(r.get(3, 2), Some(red));
        assert_eq!(r.get(4, 3), Some(red));
        assert_eq!(r.get(2, 2), Some(PackedRgba::BLACK));
        assert_eq!(r.get(3, 1), Some(PackedRgba::BLACK));
        assert_eq!(r.pixels().iter().filter(|&&p| p == red).count(), 4);
        r.fill_block(10, 10, 2, 2, red);
        r.fill_block(u32::MAX, 0, u32::MAX, 1, red);
    }

    #[test]
    fn set_get_bounds() {
        let mut r = Raster::new(Size::new(2, 2), PackedRgba::BLACK);
        r.set(1, 1, PackedRgba::WHITE);
        r.set(2, 0, PackedRgba::WHITE);
        assert_eq!(r.get(1, 1), Some(PackedRgba::WHITE));
        assert_eq!(r.get(2, 0), None);
    }

    #[test]
    fn rgba8_layout() {
        let mut r = Raster::new(Size::new(2, 1), PackedRgba::BLACK);
        r.set(1, 0, PackedRgba::rgb(1, 2, 3));
        assert_eq!(r.to_rgba8(), vec![0, 0, 0, 255, 1, 2, 3, 255]);
        assert!(r.is_opaque());
        r.set(0, 0, PackedRgba::TRANSPARENT);
        assert!(!r.is_opaque());
    }

    #[test]
    fn resize_refills() {
        let mut r = Raster::new(Size::new(2, 2), PackedRgba::WHITE);
        r.resize(Size::new(3, 1), PackedRgba::BLACK);
        assert_eq!(r.pixels(), &[PackedRgba::BLACK; 3]);
        r.resize(Size::new(0, 7), PackedRgba::BLACK);
        assert!(r.pixels().is_empty());
    }
}
