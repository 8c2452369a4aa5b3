// THEORY:
// `Settings` is the on-disk shape of a run: folders, the two classification
// constants, the decode failure policy, the class table and the weather
// generator's parameters, all in one TOML file. Every key is optional and
// falls back to the defaults the data pipeline has always used, so an empty
// file is a valid configuration.
//
// Deserialization only checks syntax and types. `Settings::validate` turns
// the raw values into the engine's validated types (`ClassificationConfig`,
// `ClassTable`, `WeatherConfig`), and that is where semantic errors surface.

use crate::core_modules::class_table::{ClassDefinition, ClassTable};
use crate::corpus::sorter::CorpusLayout;
use crate::error::ConfigError;
use crate::parallel_pipeline::DecodeFailurePolicy;
use crate::pipeline::{ClassificationConfig, DEFAULT_INTENSITY_CUTOFF, DEFAULT_SEVERITY_THRESHOLD, SeverityPipeline};
use crate::weather::WeatherConfig;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The `[weather]` table: where the CSV goes and the generator's parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherSettings {
    pub output_csv: PathBuf,
    pub start_date: NaiveDate,
    pub days: u32,
    pub temperature_celsius: (f64, f64),
    pub humidity_percent: (f64, f64),
    pub seed: Option<u64>,
}

impl WeatherSettings {
    pub fn generator(&self) -> WeatherConfig {
        WeatherConfig {
            start_date: self.start_date,
            days: self.days,
            temperature_celsius: self.temperature_celsius,
            humidity_percent: self.humidity_percent,
            seed: self.seed,
        }
    }
}

impl Default for WeatherSettings {
    fn default() -> Self {
        let generator = WeatherConfig::default();
        Self {
            output_csv: PathBuf::from("data/weather_data.csv"),
            start_date: generator.start_date,
            days: generator.days,
            temperature_celsius: generator.temperature_celsius,
            humidity_percent: generator.humidity_percent,
            seed: generator.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub intensity_cutoff: u8,
    pub severity_threshold: f64,
    pub decode_failure: DecodeFailurePolicy,
    /// Worker tasks for classification; `None` means one per CPU.
    pub workers: Option<usize>,
    /// Class table; `None` means the built-in potato table.
    pub classes: Option<Vec<ClassDefinition>>,
    pub weather: WeatherSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let layout = CorpusLayout::default();
        Self {
            raw_dir: layout.raw_dir,
            processed_dir: layout.processed_dir,
            intensity_cutoff: DEFAULT_INTENSITY_CUTOFF,
            severity_threshold: DEFAULT_SEVERITY_THRESHOLD,
            decode_failure: DecodeFailurePolicy::default(),
            workers: None,
            classes: None,
            weather: WeatherSettings::default(),
        }
    }
}

/// The validated pieces a sorting run needs.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    pub pipeline: SeverityPipeline,
    pub layout: CorpusLayout,
    pub decode_failure: DecodeFailurePolicy,
    pub workers: usize,
    pub weather: WeatherSettings,
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    pub fn validate(&self) -> Result<ValidatedSettings, ConfigError> {
        let config = ClassificationConfig::new(self.intensity_cutoff, self.severity_threshold)?;
        let table = match &self.classes {
            Some(classes) => ClassTable::new(classes.clone())?,
            None => ClassTable::default(),
        };
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        self.weather
            .generator()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(ValidatedSettings {
            pipeline: SeverityPipeline::new(config, table),
            layout: CorpusLayout::new(&self.raw_dir, &self.processed_dir),
            decode_failure: self.decode_failure,
            workers: self.workers.unwrap_or_else(num_cpus::get),
            weather: self.weather.clone(),
        })
    }
}
