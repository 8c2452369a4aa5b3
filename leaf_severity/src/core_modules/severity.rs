// THEORY:
// The Severity Classifier is the decision step of the engine. Given a source
// class and a measured spot ratio it chooses exactly one output label:
//
// 1.  The class must exist in the `ClassTable`; otherwise `UnknownClass`.
// 2.  A class without a severe label always answers with its mild label. The
//     ratio is still measured upstream so it can be logged, but it is ignored.
// 3.  Otherwise the ratio is compared with the severity threshold. The boundary
//     is inclusive: a ratio equal to the threshold is severe.
//
// It is a plain function, not a state machine. Nothing is remembered between
// calls, so any number of workers can call it at once.

use crate::core_modules::class_table::ClassTable;
use crate::core_modules::spot_ratio::spot_ratio::SpotRatio;
use crate::error::ClassificationError;
use serde::Serialize;

/// Which branch of the class policy produced a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below the threshold.
    Mild,
    /// At or above the threshold.
    Severe,
    /// The class has no severity split.
    Unsplit,
}

/// A label chosen by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityDecision {
    pub label: String,
    pub severity: Severity,
}

/// Maps `(source_class, ratio)` to an output label under `threshold`.
pub fn classify_severity(
    source_class: &str,
    ratio: SpotRatio,
    table: &ClassTable,
    threshold: f64,
) -> Result<SeverityDecision, ClassificationError> {
    let definition = table.lookup(source_class)?;

    let decision = match &definition.severe_label {
        None => SeverityDecision {
            label: definition.mild_label.clone(),
            severity: Severity::Unsplit,
        },
        Some(severe) if ratio >= threshold => SeverityDecision {
            label: severe.clone(),
            severity: Severity::Severe,
        },
        Some(_) => SeverityDecision {
            label: definition.mild_label.clone(),
            severity: Severity::Mild,
        },
    };

    Ok(decision)
}
