// THEORY:
// This file is the main entry point for the `leaf_severity` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `severity_sorter`
// command-line tool).
//
// The heart of the crate is the spot-ratio severity engine in `pipeline` and
// `core_modules`: a pure function from a decoded leaf image and its disease
// class to a severity label. Around it sit the pieces that make it useful on
// a real dataset: the `corpus` sorter and its storage interface, the
// `parallel_pipeline` worker pool, the `weather` metadata generator, and the
// TOML `config` layer.

pub mod config;
pub mod core_modules;
pub mod corpus;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod weather;

pub use core_modules::class_table::{ClassDefinition, ClassTable};
pub use core_modules::pixel_grid::pixel_grid::{PixelGrid, Rgb};
pub use error::{ClassificationError, ConfigError, CorpusError, WeatherError};
pub use pipeline::{ClassificationConfig, ClassificationResult, Severity, SeverityPipeline, classify};
