// THEORY:
// The `pipeline` module is the top-level API of the classification core. It
// chains the four stages into one pure, synchronous call:
//
//   PixelGrid -> Grayscale Reducer -> Spot Mask -> Spot Ratio -> Severity Classifier
//
// and packages the outcome as a `ClassificationResult`. There is no I/O and no
// retained state; the same grid with the same configuration always yields the
// same result. File discovery, decoding and placement are the caller's
// business (see `corpus`).
//
// The two tuning constants are fields of an explicit `ClassificationConfig`
// value rather than module-level constants, so runs with different
// thresholds can coexist and be tested side by side.

use crate::core_modules::class_table::ClassTable;
use crate::core_modules::grayscale::{self, Intensity};
use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;
use crate::core_modules::severity::classify_severity;
use crate::core_modules::spot_mask::SpotMask;
use crate::core_modules::spot_ratio::spot_ratio::{self, SpotRatio};
use crate::error::{ClassificationError, ConfigError};
use serde::Serialize;
use std::sync::Arc;

// Re-export key data structures for the public API.
pub use crate::core_modules::class_table::ClassDefinition;
pub use crate::core_modules::severity::Severity;

pub const DEFAULT_INTENSITY_CUTOFF: Intensity = 120;
pub const DEFAULT_SEVERITY_THRESHOLD: f64 = 0.15;

/// The two constants that must stay fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationConfig {
    intensity_cutoff: Intensity,
    severity_threshold: f64,
}

impl ClassificationConfig {
    /// `intensity_cutoff`: pixels strictly darker are spots.
    /// `severity_threshold`: ratios at or above it are severe; must be a finite value in [0, 1].
    pub fn new(intensity_cutoff: Intensity, severity_threshold: f64) -> Result<Self, ConfigError> {
        if !severity_threshold.is_finite() || !(0.0..=1.0).contains(&severity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "severity threshold must be within [0, 1], got {severity_threshold}"
            )));
        }
        Ok(Self {
            intensity_cutoff,
            severity_threshold,
        })
    }

    pub fn intensity_cutoff(&self) -> Intensity {
        self.intensity_cutoff
    }

    pub fn severity_threshold(&self) -> f64 {
        self.severity_threshold
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            intensity_cutoff: DEFAULT_INTENSITY_CUTOFF,
            severity_threshold: DEFAULT_SEVERITY_THRESHOLD,
        }
    }
}

/// The outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub source_class: String,
    /// Fraction of spot pixels, always within [0, 1].
    pub computed_ratio: SpotRatio,
    pub output_label: String,
    pub severity: Severity,
}

/// Measures the spot ratio of `image` under `config`.
pub fn measure_spot_ratio(image: &PixelGrid, config: &ClassificationConfig) -> Result<SpotRatio, ClassificationError> {
    // Stage 1: Grayscale reduction
    let intensity = grayscale::reduce(image)?;

    // Stage 2: Binary spot mask
    let mask = SpotMask::generate(&intensity, config.intensity_cutoff);

    // Stage 3: Ratio
    spot_ratio::compute(&mask)
}

/// Classifies one decoded image of `source_class`.
pub fn classify(
    image: &PixelGrid,
    source_class: &str,
    config: &ClassificationConfig,
    table: &ClassTable,
) -> Result<ClassificationResult, ClassificationError> {
    let ratio = measure_spot_ratio(image, config)?;

    // Stage 4: Severity decision
    let decision = classify_severity(source_class, ratio, table, config.severity_threshold)?;

    tracing::debug!(
        source_class,
        ratio,
        label = %decision.label,
        "classified {}x{} image",
        image.width(),
        image.height()
    );

    Ok(ClassificationResult {
        source_class: source_class.to_string(),
        computed_ratio: ratio,
        output_label: decision.label,
        severity: decision.severity,
    })
}

/// A configuration and class table bundled for sharing across workers.
#[derive(Debug, Clone)]
pub struct SeverityPipeline {
    config: ClassificationConfig,
    table: Arc<ClassTable>,
}

impl SeverityPipeline {
    pub fn new(config: ClassificationConfig, table: ClassTable) -> Self {
        Self {
            config,
            table: Arc::new(table),
        }
    }

    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }

    pub fn table(&self) -> &ClassTable {
        &self.table
    }

    pub fn classify(&self, image: &PixelGrid, source_class: &str) -> Result<ClassificationResult, ClassificationError> {
        classify(image, source_class, &self.config, &self.table)
    }

    /// Classifies an image that could not be measured as if it had no spots.
    ///
    /// This is the legacy fail-soft treatment of undecodable files. It never
    /// looks at pixels, but an unknown class is still reported.
    pub fn classify_unmeasured(&self, source_class: &str) -> Result<ClassificationResult, ClassificationError> {
        let decision = classify_severity(source_class, 0.0, &self.table, self.config.severity_threshold)?;
        Ok(ClassificationResult {
            source_class: source_class.to_string(),
            computed_ratio: 0.0,
            output_label: decision.label,
            severity: decision.severity,
        })
    }
}

impl Default for SeverityPipeline {
    fn default() -> Self {
        Self::new(ClassificationConfig::default(), ClassTable::default())
    }
}
