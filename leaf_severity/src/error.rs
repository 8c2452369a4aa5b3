// THEORY:
// Every failure the engine can report lives here, split by layer. The core
// (`ClassificationError`) only ever speaks about images and classes; it has no
// notion of files. The outer layers (`CorpusError`, `WeatherError`,
// `ConfigError`) wrap I/O and configuration problems and carry the path that
// caused them, so a caller can log one line and move on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the pure classification core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    /// The image has no pixels, does not match its declared size, or could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The source class is absent from the class table.
    #[error("unknown source class: {0:?}")]
    UnknownClass(String),
}

/// Failures while loading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the corpus sorter for a single file or a whole run.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("worker pool error: {0}")]
    Worker(String),
}

impl CorpusError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CorpusError::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the synthetic weather metadata generator.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("no images found in the processed directory {0}")]
    NoImages(PathBuf),

    #[error("invalid weather settings: {0}")]
    Invalid(String),

    #[error("failed to write weather data to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
