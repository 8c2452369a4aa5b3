// THEORY:
// The class table is the routing policy of the corpus. Each raw source class
// (a folder name such as `Potato___Early_blight`) maps to a mild output label
// and, optionally, a severe one. A class without a severe label has no
// severity split: every one of its images lands in the mild bucket.
//
// The table is an explicit, validated value. It is built once per run, shared
// read-only by every worker, and a lookup of a class that is not in it is a
// reportable `UnknownClass` failure, never a silent default.

use crate::error::{ClassificationError, ConfigError};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

/// The output-label policy for one source class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassDefinition {
    /// The raw source-class identifier (the name of its folder under the raw directory).
    #[serde(rename = "source")]
    pub source_class: String,
    /// Label used below the severity threshold, or always when there is no severe label.
    #[serde(rename = "mild")]
    pub mild_label: String,
    /// Label used at or above the severity threshold.
    #[serde(rename = "severe", default)]
    pub severe_label: Option<String>,
}

impl ClassDefinition {
    pub fn split(source_class: &str, mild_label: &str, severe_label: &str) -> Self {
        Self {
            source_class: source_class.to_string(),
            mild_label: mild_label.to_string(),
            severe_label: Some(severe_label.to_string()),
        }
    }

    pub fn unsplit(source_class: &str, label: &str) -> Self {
        Self {
            source_class: source_class.to_string(),
            mild_label: label.to_string(),
            severe_label: None,
        }
    }

    pub fn has_severity_split(&self) -> bool {
        self.severe_label.is_some()
    }

    /// The mild label followed by the severe label, if any.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.mild_label.as_str()).chain(self.severe_label.as_deref())
    }
}

/// An ordered, validated set of `ClassDefinition`s keyed by source class.
#[derive(Debug, Clone)]
pub struct ClassTable {
    definitions: Vec<ClassDefinition>,
    index: HashMap<String, usize>,
}

impl ClassTable {
    /// Validates and indexes `definitions`, keeping their order.
    pub fn new(definitions: Vec<ClassDefinition>) -> Result<Self, ConfigError> {
        if definitions.is_empty() {
            return Err(ConfigError::Invalid("class table is empty".to_string()));
        }

        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if def.source_class.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("class #{} has an empty source name", i + 1)));
            }
            if def.labels().any(|label| label.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "class {:?} has an empty output label",
                    def.source_class
                )));
            }
            if def.severe_label.as_deref() == Some(def.mild_label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "class {:?} uses {:?} as both mild and severe label",
                    def.source_class, def.mild_label
                )));
            }
            if index.insert(def.source_class.clone(), i).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "class {:?} is defined more than once",
                    def.source_class
                )));
            }
        }

        Ok(Self { definitions, index })
    }

    /// The three potato classes of the PlantVillage dataset.
    pub fn plant_village_potato() -> Self {
        Self::new(vec![
            ClassDefinition::split("Potato___Early_blight", "Early_Blight_Mild", "Early_Blight_Severe"),
            ClassDefinition::split("Potato___Late_blight", "Late_Blight_Mild", "Late_Blight_Severe"),
            ClassDefinition::unsplit("Potato___healthy", "Healthy"),
        ])
        .expect("built-in potato class table is valid")
    }

    pub fn lookup(&self, source_class: &str) -> Result<&ClassDefinition, ClassificationError> {
        self.index
            .get(source_class)
            .map(|&i| &self.definitions[i])
            .ok_or_else(|| ClassificationError::UnknownClass(source_class.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Every distinct output label in the table, sorted.
    pub fn output_labels(&self) -> BTreeSet<&str> {
        self.definitions.iter().flat_map(ClassDefinition::labels).collect()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::plant_village_potato()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_plant_village_potato() {
        let table = ClassTable::default();
        assert_eq!(table.len(), 3);
        let healthy = table.lookup("Potato___healthy").unwrap();
        assert!(!healthy.has_severity_split());
        assert_eq!(healthy.mild_label, "Healthy");

        let labels: Vec<_> = table.output_labels().into_iter().collect();
        assert_eq!(
            labels,
            vec![
                "Early_Blight_Mild",
                "Early_Blight_Severe",
                "Healthy",
                "Late_Blight_Mild",
                "Late_Blight_Severe"
            ]
        );
    }

    #[test]
    fn lookup_of_absent_class_is_unknown() {
        let table = ClassTable::default();
        assert_eq!(
            table.lookup("Tomato___healthy"),
            Err(ClassificationError::UnknownClass("Tomato___healthy".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_sources() {
        let err = ClassTable::new(vec![
            ClassDefinition::unsplit("A", "a"),
            ClassDefinition::unsplit("A", "b"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_empty_and_identical_labels() {
        assert!(ClassTable::new(vec![ClassDefinition::unsplit("A", " ")]).is_err());
        assert!(ClassTable::new(vec![ClassDefinition::split("A", "x", "")]).is_err());
        assert!(ClassTable::new(vec![ClassDefinition::split("A", "x", "x")]).is_err());
        assert!(ClassTable::new(vec![ClassDefinition::unsplit("", "x")]).is_err());
        assert!(ClassTable::new(Vec::new()).is_err());
    }

    #[test]
    fn shared_labels_are_listed_once() {
        let table = ClassTable::new(vec![
            ClassDefinition::split("Potato___Early_blight", "Blight_Mild", "Blight_Severe"),
            ClassDefinition::split("Potato___Late_blight", "Blight_Mild", "Blight_Severe"),
        ])
        .unwrap();
        assert_eq!(table.output_labels().len(), 2);
    }
}
