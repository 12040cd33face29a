#![forbid(unsafe_code)]

//! Blob extraction from the heat grid.

use heatfield_core::{EngineConfig, Point};

use crate::grid::HeatGrid;

/// A metaball source: cell top-left in output pixels plus `energy / max_heat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub position: Point,
    /// Normalized intensity in `[0, 1]`.
    pub intensity: f32,
}

/// Emits one [`Blob`] per cell above the noise floor.
///
/// Output order is unspecified; field evaluation is a pure sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobExtractor {
    noise_floor: f32,
    /// 0 = unbounded.
    max_blobs: usize,
}

impl BlobExtractor {
    pub fn new(noise_floor: f32, max_blobs: usize) -> Self {
        Self {
            noise_floor,
            max_blobs,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.blob_noise_floor, config.max_blobs)
    }

    /// Rebuild `out` from `grid`. Previous contents are discarded.
    ///
    /// When a blob budget is set and exceeded, only the hottest blobs are kept.
    pub fn extract_into(&self, grid: &HeatGrid, out: &mut Vec<Blob>) {
        out.clear();
        let max_heat = grid.max_heat();
        if max_heat <= 0.0 {
            return;
        }
        let dims = grid.dims();
        let cells = grid.cells();
        for row in 0..dims.height {
            for col in 0..dims.width {
                let energy = cells[row as usize * dims.width as usize + col as usize];
                if energy > self.noise_floor {
                    out.push(Blob {
                        position: grid.cell_origin(col, row),
                        intensity: (energy / max_heat).clamp(0.0, 1.0),
                    });
                }
            }
        }

        if self.max_blobs > 0 && out.len() > self.max_blobs {
            out.select_nth_unstable_by(self.max_blobs - 1, |a, b| {
                b.intensity.total_cmp(&a.intensity)
            });
            out.truncate(self.max_blobs);
        }
    }

    pub fn extract(&self, grid: &HeatGrid) -> Vec<Blob> {
        let mut out = Vec::new();
        self.extract_into(grid, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatfield_core::Size;

    fn grid() -> HeatGrid {
        HeatGrid::new(Size::new(200, 100), 20, 50.0)
    }

    #[test]
    fn only_cells_above_floor_become_blobs() {
        let mut g = grid();
        g.deposit(1, 1, 2.0);
        g.deposit(3, 2, 2.5);
        g.deposit(9, 4, 50.0);
        let blobs = BlobExtractor::new(2.0, 0).extract(&g);
        assert_eq!(blobs.len(), 2);
        assert!(blobs.contains(&Blob {
            position: Point::new(60.0, 40.0),
            intensity: 0.05,
        }));
        assert!(blobs.contains(&Blob {
            position: Point::new(180.0, 80.0),
            intensity: 1.0,
        }));
    }

    #[test]
    fn empty_grid_yields_nothing() {
        assert!(BlobExtractor::new(2.0, 0).extract(&grid()).is_empty());
    }

    #[test]
    fn budget_keeps_hottest() {
        let mut g = grid();
        for col in 0..10 {
            g.deposit(col, 0, 3.0 + col as f32);
        }
        let blobs = BlobExtractor::new(2.0, 3).extract(&g);
        assert_eq!(blobs.len(), 3);
        let mut xs: Vec<_> = blobs.iter().map(|b| b.position.x as u32).collect();
        xs.sort_unstable();
        assert_eq!(xs, vec![140, 160, 180]);
    }

    #[test]
    fn extract_into_reuses_buffer() {
        let mut g = grid();
        g.deposit(0, 0, 10.0);
        let ex = BlobExtractor::new(2.0, 0);
        let mut out = vec![
            Blob {
                position: Point::default(),
                intensity: 0.0
            };
            16
        ];
        let cap = out.capacity();
        ex.extract_into(&g, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out.capacity(), cap);
    }

    #[test]
    fn floor_comes_from_config() {
        let config = EngineConfig {
            blob_noise_floor: 5.0,
            max_blobs: 7,
            ..EngineConfig::default()
        };
        assert_eq!(BlobExtractor::from_config(&config), BlobExtractor::new(5.0, 7));
    }
}
