// THEORY:
// The Grayscale Reducer is the first analytical stage. It collapses each RGB
// sample of a `PixelGrid` into one 8-bit intensity, producing an
// `IntensityGrid` of the same shape.
//
// The formula is fixed for the lifetime of a deployment so spot ratios stay
// comparable across a whole corpus: Rec. 601 luma (0.299 R + 0.587 G + 0.114 B),
// rounded to the nearest integer and clamped to 0..=255. This is the same
// weighting OpenCV uses for its BGR to gray conversion.
//
// A grid with zero width or zero height is refused here with `InvalidImage`
// instead of producing an empty intensity grid.

use crate::core_modules::pixel_grid::pixel_grid::{PixelGrid, Rgb};
use crate::error::ClassificationError;

pub type Intensity = u8;

/// A single-channel image derived from a `PixelGrid`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityGrid {
    width: u32,
    height: u32,
    values: Vec<Intensity>,
}

impl IntensityGrid {
    /// Builds a grid from row-major intensities. Fails if the value count does not match.
    pub fn from_values(width: u32, height: u32, values: Vec<Intensity>) -> Result<Self, ClassificationError> {
        if values.len() != width as usize * height as usize {
            return Err(ClassificationError::InvalidImage(format!(
                "{}x{} intensity grid needs {} values, got {}",
                width,
                height,
                width as usize * height as usize,
                values.len()
            )));
        }
        Ok(Self { width, height, values })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[Intensity] {
        &self.values
    }
}

/// Reduces one RGB sample to its intensity.
pub fn intensity_of(pixel: Rgb) -> Intensity {
    pixel.luminance().round().clamp(0.0, 255.0) as Intensity
}

/// Converts a color grid into an intensity grid of identical dimensions.
pub fn reduce(grid: &PixelGrid) -> Result<IntensityGrid, ClassificationError> {
    if grid.is_degenerate() {
        return Err(ClassificationError::InvalidImage(format!(
            "image has zero area ({}x{})",
            grid.width(),
            grid.height()
        )));
    }

    let values = grid.pixels().iter().copied().map(intensity_of).collect();

    Ok(IntensityGrid {
        width: grid.width(),
        height: grid.height(),
        values,
    })
}
