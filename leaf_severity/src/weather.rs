// THEORY:
// The weather module attaches synthetic growing-season conditions to every
// processed image so downstream experiments can join images with
// "environment" features. It is unrelated to the classification core: its
// only input is the list of file names already sorted into the processed
// folders.
//
// Each image gets a date drawn uniformly from a fixed period and a
// temperature and humidity drawn uniformly from their ranges, rounded to one
// decimal. With a seed the output is reproducible.

use crate::corpus::storage::CorpusStorage;
use crate::error::WeatherError;
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const CSV_HEADER: &str = "image_filename,date,temperature_celsius,humidity_percent";

/// The simulated period and ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub start_date: NaiveDate,
    /// Length of the period; dates fall in `start_date ..= start_date + days - 1`.
    pub days: u32,
    /// Inclusive (min, max) in degrees Celsius.
    pub temperature_celsius: (f64, f64),
    /// Inclusive (min, max) in percent.
    pub humidity_percent: (f64, f64),
    pub seed: Option<u64>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            // A typical potato growing-season month.
            start_date: NaiveDate::from_ymd_opt(2023, 6, 1).expect("2023-06-01 is a valid date"),
            days: 30,
            temperature_celsius: (15.0, 28.0),
            humidity_percent: (60.0, 95.0),
            seed: None,
        }
    }
}

impl WeatherConfig {
    pub fn validate(&self) -> Result<(), WeatherError> {
        if self.days == 0 {
            return Err(WeatherError::Invalid("period must cover at least one day".to_string()));
        }
        for (name, (min, max)) in [
            ("temperature_celsius", self.temperature_celsius),
            ("humidity_percent", self.humidity_percent),
        ] {
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(WeatherError::Invalid(format!("{name} range [{min}, {max}] is not valid")));
            }
        }
        if self.start_date.checked_add_days(Days::new(u64::from(self.days) - 1)).is_none() {
            return Err(WeatherError::Invalid("period runs past the last representable date".to_string()));
        }
        Ok(())
    }
}

/// Synthetic conditions for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub image_filename: String,
    pub date: NaiveDate,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The file names of every image in every subfolder of `processed_dir`.
pub fn collect_processed_filenames(
    storage: &dyn CorpusStorage,
    processed_dir: &Path,
) -> Result<Vec<String>, WeatherError> {
    let io_err = |path: &Path, source: io::Error| WeatherError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut filenames = Vec::new();
    for class_dir in storage.list_directories(processed_dir).map_err(|e| io_err(processed_dir, e))? {
        for file in storage.list_files(&class_dir).map_err(|e| io_err(&class_dir, e))? {
            if let Some(name) = file.file_name() {
                filenames.push(name.to_string_lossy().into_owned());
            }
        }
    }
    Ok(filenames)
}

/// One record per file name, drawn from `rng`.
pub fn generate_records_with<R: Rng>(
    filenames: &[String],
    config: &WeatherConfig,
    rng: &mut R,
) -> Result<Vec<WeatherRecord>, WeatherError> {
    config.validate()?;
    let (t_min, t_max) = config.temperature_celsius;
    let (h_min, h_max) = config.humidity_percent;

    filenames
        .iter()
        .map(|filename| {
            let offset = rng.random_range(0..config.days);
            let date = config
                .start_date
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or_else(|| WeatherError::Invalid("date out of range".to_string()))?;
            Ok(WeatherRecord {
                image_filename: filename.clone(),
                date,
                temperature_celsius: round_to_tenth(rng.random_range(t_min..=t_max)),
                humidity_percent: round_to_tenth(rng.random_range(h_min..=h_max)),
            })
        })
        .collect()
}

/// One record per file name, seeded from `config.seed` or the OS.
pub fn generate_records(filenames: &[String], config: &WeatherConfig) -> Result<Vec<WeatherRecord>, WeatherError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    generate_records_with(filenames, config, &mut rng)
}

fn csv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\"")).into()
    } else {
        value.into()
    }
}

/// Writes `records` as CSV with a header row.
pub fn write_csv<W: Write>(records: &[WeatherRecord], mut writer: W) -> io::Result<()> {
    writeln!(writer, "{CSV_HEADER}")?;
    for record in records {
        writeln!(
            writer,
            "{},{},{:.1},{:.1}",
            csv_field(&record.image_filename),
            record.date.format("%Y-%m-%d"),
            record.temperature_celsius,
            record.humidity_percent
        )?;
    }
    writer.flush()
}

/// Writes `records` to `path`, creating its parent folder. Returns the row count.
pub fn save_csv(records: &[WeatherRecord], path: &Path) -> Result<usize, WeatherError> {
    let io_err = |source| WeatherError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = fs::File::create(path).map_err(io_err)?;
    write_csv(records, BufWriter::new(file)).map_err(io_err)?;
    Ok(records.len())
}

/// Generates weather data for every processed image and writes it to `output_csv`.
pub fn generate_weather_data(
    storage: &dyn CorpusStorage,
    processed_dir: &Path,
    output_csv: &Path,
    config: &WeatherConfig,
) -> Result<usize, WeatherError> {
    let filenames = collect_processed_filenames(storage, processed_dir)?;
    if filenames.is_empty() {
        return Err(WeatherError::NoImages(processed_dir.to_path_buf()));
    }
    tracing::info!(images = filenames.len(), "generating weather data");

    let records = generate_records(&filenames, config)?;
    let rows = save_csv(&records, output_csv)?;

    tracing::info!(rows, path = %output_csv.display(), "weather data written");
    Ok(rows)
}
