#![forbid(unsafe_code)]

//! Coarse heat grid for keypoint and mask input.
//!
//! Cells are stored row-major. Grid dimensions are always
//! `floor(output / cell_size)`; a resize reallocates and zero-fills, so any
//! energy in flight is dropped.

use heatfield_core::{Point, Size};

use crate::decay::TemporalDecay;

/// Fixed-size 2D array of non-negative energy values bounded by `max_heat`.
#[derive(Debug, Clone)]
pub struct HeatGrid {
    cols: u32,
    rows: u32,
    cell_size: u32,
    max_heat: f32,
    cells: Vec<f32>,
}

impl HeatGrid {
    pub fn new(output: Size, cell_size: u32, max_heat: f32) -> Self {
        let dims = output.cells(cell_size);
        Self {
            cols: dims.width,
            rows: dims.height,
            cell_size,
            max_heat: max_heat.max(0.0),
            cells: vec![0.0; dims.area()],
        }
    }

    /// Reallocate for a new output size (and optionally cell size). Zero-fills.
    pub fn resize(&mut self, output: Size, cell_size: u32) {
        let dims = output.cells(cell_size);
        self.cols = dims.width;
        self.rows = dims.height;
        self.cell_size = cell_size;
        self.cells.clear();
        self.cells.resize(dims.area(), 0.0);
    }

    /// Change the cap. Existing cells above it are clamped on the next decay.
    pub fn set_max_heat(&mut self, max_heat: f32) {
        self.max_heat = max_heat.max(0.0);
    }

    #[inline]
    pub fn dims(&self) -> Size {
        Size::new(self.cols, self.rows)
    }

    #[inline]
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    #[inline]
    pub fn max_heat(&self) -> f32 {
        self.max_heat
    }

    #[inline]
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Energy at `(col, row)`; out of range reads as 0.
    #[inline]
    pub fn get(&self, col: i32, row: i32) -> f32 {
        self.index(col, row).map_or(0.0, |i| self.cells[i])
    }

    #[inline]
    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col as u32 >= self.cols || row as u32 >= self.rows {
            return None;
        }
        Some(row as usize * self.cols as usize + col as usize)
    }

    /// Multiply every cell by the decay factor, then clamp to the cap.
    ///
    /// The grid's own `max_heat` is applied as well, so the tighter cap wins.
    pub fn decay_and_cap(&mut self, decay: TemporalDecay) -> f32 {
        let cap = self.max_heat;
        let mut peak = 0.0f32;
        for v in &mut self.cells {
            *v = decay.apply(*v).min(cap);
            peak = peak.max(*v);
        }
        peak
    }

    /// Add `amount` to one cell, clamped to the cap. Returns `false` when
    /// the cell is outside the grid.
    pub fn deposit(&mut self, col: i32, row: i32, amount: f32) -> bool {
        let Some(i) = self.index(col, row) else {
            return false;
        };
        if amount.is_finite() && amount > 0.0 {
            self.cells[i] = (self.cells[i] + amount).min(self.max_heat);
        }
        true
    }

    /// Deposit into the cell containing output-pixel point `p`.
    pub fn deposit_at(&mut self, p: Point, amount: f32) -> bool {
        match self.cell_of(p) {
            Some((col, row)) => self.deposit(col, row, amount),
            None => false,
        }
    }

    /// Spread `intensity` around `(col, row)` with a linear radial falloff.
    ///
    /// A cell at Euclidean cell distance `d` receives
    /// `max(0, intensity * (1 - d / radius))`, clamped to the cap after each
    /// addition. With `radius == 0` only the center cell is touched. The
    /// center may lie outside the grid; in-bounds neighbours still receive
    /// their share.
    pub fn inject(&mut self, col: i32, row: i32, intensity: f32, radius: f32) {
        if !(intensity.is_finite() && intensity > 0.0) {
            return;
        }
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let reach = radius.ceil() as i32;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let Some(i) = self.index(col + dx, row + dy) else {
                    continue;
                };
                let dist = ((dx * dx + dy * dy) as f32).sqrt();
                let heat = spread_heat(intensity, dist, radius);
                if heat > 0.0 {
                    self.cells[i] = (self.cells[i] + heat).min(self.max_heat);
                }
            }
        }
    }

    /// [`inject`](Self::inject) centered on the cell containing output-pixel point `p`.
    pub fn inject_at(&mut self, p: Point, intensity: f32, radius: f32) {
        if let Some((col, row)) = self.cell_of(p) {
            self.inject(col, row, intensity, radius);
        }
    }

    /// Grid cell containing an output-pixel point. May be out of bounds;
    /// `None` only for non-finite input or a zero cell size.
    #[inline]
    pub fn cell_of(&self, p: Point) -> Option<(i32, i32)> {
        if self.cell_size == 0 || !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        let cs = self.cell_size as f32;
        Some(((p.x / cs).floor() as i32, (p.y / cs).floor() as i32))
    }

    /// Top-left corner of `(col, row)` in output pixels.
    #[inline]
    pub fn cell_origin(&self, col: u32, row: u32) -> Point {
        Point::new(
            (col * self.cell_size) as f32,
            (row * self.cell_size) as f32,
        )
    }

    /// Number of cells holding more than `floor`.
    pub fn active_cells(&self, floor: f32) -> usize {
        self.cells.iter().filter(|&&v| v > floor).count()
    }

    pub fn peak(&self) -> f32 {
        self.cells.iter().copied().fold(0.0, f32::max)
    }

    pub fn total(&self) -> f32 {
        self.cells.iter().sum()
    }

    pub fn clear(&mut self) {
        self.cells.fill(0.0);
    }
}

#[inline]
fn spread_heat(intensity: f32, dist: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return if dist == 0.0 { intensity } else { 0.0 };
    }
    (intensity * (1.0 - dist / radius)).max(0.0)
}
