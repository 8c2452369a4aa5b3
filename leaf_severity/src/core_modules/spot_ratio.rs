// THEORY:
// The Spot Ratio Calculator reduces a `SpotMask` to the single number the rest
// of the system cares about: the fraction of the image covered by disease
// spots. It is a stateless utility, deterministic for a given mask, and the
// result always lies in 0.0..=1.0.
//
// An empty mask never arrives here through the pipeline because the Grayscale
// Reducer already refuses zero-area images. If one does, the calculator
// answers with `InvalidImage` instead of dividing by zero.

pub mod spot_ratio {
    use crate::core_modules::spot_mask::SpotMask;
    use crate::error::ClassificationError;

    pub type SpotRatio = f64;

    /// Fraction of mask cells marked as spot.
    pub fn compute(mask: &SpotMask) -> Result<SpotRatio, ClassificationError> {
        let total = mask.cell_count();
        if total == 0 {
            return Err(ClassificationError::InvalidImage(
                "cannot compute a spot ratio over zero cells".to_string(),
            ));
        }
        Ok(mask.spot_count() as SpotRatio / total as SpotRatio)
    }
}
