use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use leaf_severity::config::Settings;
use leaf_severity::parallel_pipeline::DecodeFailurePolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "severity-sorter", author, version, long_about = None)]
#[command(about = "Sort a plant-disease image corpus into severity buckets and attach synthetic weather data.")]
pub struct Cli {
    /// TOML settings file. Command-line flags override its values.
    #[arg(short, long, env = "SEVERITY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every raw image and copy it into its severity folder.
    Sort(SortArgs),
    /// Write a synthetic weather CSV for every processed image.
    Weather(WeatherArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecodeFailureArg {
    /// Report undecodable images and leave them out.
    Skip,
    /// Place undecodable images in the mild bucket, as if spot-free.
    TreatAsClean,
}

impl From<DecodeFailureArg> for DecodeFailurePolicy {
    fn from(arg: DecodeFailureArg) -> Self {
        match arg {
            DecodeFailureArg::Skip => DecodeFailurePolicy::Skip,
            DecodeFailureArg::TreatAsClean => DecodeFailurePolicy::TreatAsClean,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct SortArgs {
    /// Folder holding one subfolder per source class.
    #[arg(long)]
    pub raw_dir: Option<PathBuf>,

    /// Folder receiving one subfolder per output label.
    #[arg(long)]
    pub processed_dir: Option<PathBuf>,

    /// Pixels with an intensity strictly below this are spots (0-255).
    #[arg(long)]
    pub cutoff: Option<u8>,

    /// Spot ratio at or above which an image is severe (0.0-1.0).
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Number of classification workers.
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// What to do with images that cannot be decoded.
    #[arg(long, value_enum)]
    pub decode_failure: Option<DecodeFailureArg>,

    /// Write the full sorting report as JSON to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl SortArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(raw_dir) = &self.raw_dir {
            settings.raw_dir = raw_dir.clone();
        }
        if let Some(processed_dir) = &self.processed_dir {
            settings.processed_dir = processed_dir.clone();
        }
        if let Some(cutoff) = self.cutoff {
            settings.intensity_cutoff = cutoff;
        }
        if let Some(threshold) = self.threshold {
            settings.severity_threshold = threshold;
        }
        if let Some(workers) = self.workers {
            settings.workers = Some(workers);
        }
        if let Some(policy) = self.decode_failure {
            settings.decode_failure = policy.into();
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct WeatherArgs {
    /// Folder whose label subfolders hold the processed images.
    #[arg(long)]
    pub processed_dir: Option<PathBuf>,

    /// Output CSV path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl WeatherArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(processed_dir) = &self.processed_dir {
            settings.processed_dir = processed_dir.clone();
        }
        if let Some(output) = &self.output {
            settings.weather.output_csv = output.clone();
        }
        if let Some(seed) = self.seed {
            settings.weather.seed = Some(seed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sort_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "severity-sorter",
            "sort",
            "--raw-dir",
            "in",
            "--threshold",
            "0.25",
            "--cutoff",
            "90",
            "-j",
            "3",
            "--decode-failure",
            "treat-as-clean",
        ])
        .unwrap();

        let Command::Sort(args) = cli.command else {
            panic!("expected the sort subcommand");
        };
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.raw_dir, PathBuf::from("in"));
        assert_eq!(settings.processed_dir, PathBuf::from("data/processed"));
        assert_eq!(settings.severity_threshold, 0.25);
        assert_eq!(settings.intensity_cutoff, 90);
        assert_eq!(settings.workers, Some(3));
        assert_eq!(settings.decode_failure, DecodeFailurePolicy::TreatAsClean);
    }

    #[test]
    fn weather_flags_override_settings() {
        let cli = Cli::try_parse_from(["severity-sorter", "weather", "-o", "out.csv", "--seed", "4"]).unwrap();
        let Command::Weather(args) = cli.command else {
            panic!("expected the weather subcommand");
        };
        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.weather.output_csv, PathBuf::from("out.csv"));
        assert_eq!(settings.weather.seed, Some(4));
    }

    #[test]
    fn cutoff_must_fit_a_byte() {
        assert!(Cli::try_parse_from(["severity-sorter", "sort", "--cutoff", "256"]).is_err());
    }
}
