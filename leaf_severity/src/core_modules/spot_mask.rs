// THEORY:
// The `SpotMask` is the binary view of a leaf. Every intensity strictly below
// the configured cutoff is marked `true` ("dark spot"); everything at or above
// it is healthy tissue or background.
//
// The cutoff is a fixed, global threshold, never adaptive. Two images can only
// be compared by their spot ratios if both masks were cut at the same level,
// so the cutoff comes from the run's `ClassificationConfig` and is identical
// for every image in that run.

use crate::core_modules::grayscale::{Intensity, IntensityGrid};
use crate::error::ClassificationError;

/// A boolean grid where `true` marks a disease-spot pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl SpotMask {
    /// Thresholds `grid`: a cell is a spot iff its intensity is strictly below `cutoff`.
    pub fn generate(grid: &IntensityGrid, cutoff: Intensity) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            cells: grid.values().iter().map(|&v| v < cutoff).collect(),
        }
    }

    /// Builds a mask from row-major cells. Fails if the cell count does not match.
    pub fn from_cells(width: u32, height: u32, cells: Vec<bool>) -> Result<Self, ClassificationError> {
        if cells.len() != width as usize * height as usize {
            return Err(ClassificationError::InvalidImage(format!(
                "{}x{} mask needs {} cells, got {}",
                width,
                height,
                width as usize * height as usize,
                cells.len()
            )));
        }
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Number of cells marked as spot.
    pub fn spot_count(&self) -> usize {
        self.cells.iter().filter(|&&spot| spot).count()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_strict() {
        let grid = IntensityGrid::from_values(4, 1, vec![119, 120, 121, 0]).unwrap();
        let mask = SpotMask::generate(&grid, 120);
        assert_eq!(mask.cells(), &[true, false, false, true]);
        assert_eq!(mask.spot_count(), 2);
        assert_eq!(mask.cell_count(), 4);
    }

    #[test]
    fn zero_cutoff_marks_nothing() {
        let grid = IntensityGrid::from_values(2, 2, vec![0, 0, 0, 0]).unwrap();
        assert_eq!(SpotMask::generate(&grid, 0).spot_count(), 0);
    }

    #[test]
    fn keeps_grid_dimensions() {
        let grid = IntensityGrid::from_values(3, 2, vec![255; 6]).unwrap();
        let mask = SpotMask::generate(&grid, 255);
        assert_eq!((mask.width(), mask.height()), (3, 2));
        assert_eq!(mask.spot_count(), 0);
    }
}
