// THEORY:
// The `CorpusSorter` is the orchestrator around the classification core. It
// owns nothing analytical; it walks the raw corpus, turns every eligible file
// into an independent `SortJob`, lets the `WorkerPool` classify them in
// parallel, and finally places each file under
// `<processed_dir>/<output_label>/<file_name>`.
//
// Key architectural principles:
// 1.  **Storage abstraction**: every file-system touch goes through
//     `CorpusStorage`, so the sorter runs unchanged over a real directory or an
//     in-memory tree.
// 2.  **One writer**: workers only read. Placement happens in this task, one
//     file at a time, so two images heading for the same folder never race.
// 3.  **Failure isolation**: a missing class folder, an unreadable file, an
//     undecodable image or a failed copy is logged and recorded in the
//     `SortReport`; the rest of the corpus is still processed. Only a failure
//     to create the output folders aborts the run.

use crate::corpus::storage::CorpusStorage;
use crate::error::CorpusError;
use crate::parallel_pipeline::{DecodeFailurePolicy, SortJob, WorkerContext, WorkerPool};
use crate::pipeline::{ClassificationResult, SeverityPipeline};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extensions accepted as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// True when the file name ends in `.` plus one of `IMAGE_EXTENSIONS`, in any case.
/// A bare `.png` qualifies.
pub fn is_eligible(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| name.strip_suffix(ext).is_some_and(|stem| stem.ends_with('.')))
}

/// Where raw images are read from and sorted images are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl CorpusLayout {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    /// `<raw_dir>/<source_class>`
    pub fn source_dir(&self, source_class: &str) -> PathBuf {
        self.raw_dir.join(source_class)
    }

    /// `<processed_dir>/<label>`
    pub fn label_dir(&self, label: &str) -> PathBuf {
        self.processed_dir.join(label)
    }
}

impl Default for CorpusLayout {
    fn default() -> Self {
        Self::new("data/raw", "data/processed")
    }
}

/// A file the sorter placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub source_path: PathBuf,
    pub destination: PathBuf,
    #[serde(flatten)]
    pub result: ClassificationResult,
}

/// A file the sorter could not place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// The summary of one sorting run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SortReport {
    /// Eligible image files found across all class folders.
    pub examined: usize,
    /// Files without an image extension.
    pub ignored: usize,
    /// Files placed by this run, per output label.
    pub placed: BTreeMap<String, usize>,
    /// Files present after the run in every folder under the processed directory, by folder name.
    pub final_counts: BTreeMap<String, usize>,
    pub skipped: Vec<SkippedFile>,
    /// Source classes whose raw folder was missing or unreadable.
    pub missing_classes: Vec<String>,
    pub placements: Vec<Placement>,
}

impl SortReport {
    pub fn placed_total(&self) -> usize {
        self.placed.values().sum()
    }
}

pub struct CorpusSorter {
    storage: Arc<dyn CorpusStorage>,
    pipeline: Arc<SeverityPipeline>,
    layout: CorpusLayout,
    policy: DecodeFailurePolicy,
    workers: usize,
}

impl CorpusSorter {
    pub fn new(storage: Arc<dyn CorpusStorage>, pipeline: SeverityPipeline, layout: CorpusLayout) -> Self {
        Self {
            storage,
            pipeline: Arc::new(pipeline),
            layout,
            policy: DecodeFailurePolicy::default(),
            workers: num_cpus::get(),
        }
    }

    pub fn with_decode_failure_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    /// Sorts the whole corpus. Fails only if the output folders cannot be created or counted.
    pub async fn run(&self) -> Result<SortReport, CorpusError> {
        tracing::info!(
            raw_dir = %self.layout.raw_dir.display(),
            processed_dir = %self.layout.processed_dir.display(),
            "starting image sorting"
        );
        let mut report = SortReport::default();

        // --- 1. Destination folders ---
        for label in self.pipeline.table().output_labels() {
            let dir = self.layout.label_dir(label);
            self.storage
                .ensure_directory(&dir)
                .map_err(|e| CorpusError::storage(&dir, e))?;
        }

        // --- 2. Discovery ---
        let jobs = self.discover_jobs(&mut report);

        // --- 3. Parallel classification ---
        let pool = WorkerPool::new(
            WorkerContext {
                pipeline: self.pipeline.clone(),
                storage: self.storage.clone(),
                policy: self.policy,
            },
            self.workers,
        );
        let outcomes = futures::future::join_all(jobs.iter().cloned().map(|job| pool.submit(job))).await;
        pool.shutdown().await;

        // --- 4. Serialized placement ---
        for (job, outcome) in jobs.into_iter().zip(outcomes) {
            match outcome.and_then(|result| self.place(&job, result)) {
                Ok(placement) => {
                    *report.placed.entry(placement.result.output_label.clone()).or_default() += 1;
                    report.placements.push(placement);
                }
                Err(err) => {
                    tracing::warn!(path = %job.source_path.display(), error = %err, "skipping image");
                    report.skipped.push(SkippedFile {
                        path: job.source_path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        // --- 5. Final counts ---
        // Every folder under the processed directory, including ones no current label maps to.
        let processed_dir = &self.layout.processed_dir;
        for dir in self
            .storage
            .list_directories(processed_dir)
            .map_err(|e| CorpusError::storage(processed_dir, e))?
        {
            let Some(label) = dir.file_name() else { continue };
            let count = self
                .storage
                .list_files(&dir)
                .map_err(|e| CorpusError::storage(&dir, e))?
                .len();
            report.final_counts.insert(label.to_string_lossy().into_owned(), count);
        }

        tracing::info!(
            examined = report.examined,
            placed = report.placed_total(),
            skipped = report.skipped.len(),
            missing_classes = report.missing_classes.len(),
            "image sorting complete"
        );
        Ok(report)
    }

    /// Lists every class folder and returns one job per eligible file, in table order.
    pub fn discover_jobs(&self, report: &mut SortReport) -> Vec<SortJob> {
        let mut jobs = Vec::new();

        for definition in self.pipeline.table().iter() {
            let source_dir = self.layout.source_dir(&definition.source_class);
            if !self.storage.is_directory(&source_dir) {
                tracing::warn!(path = %source_dir.display(), "raw data folder not found");
                report.missing_classes.push(definition.source_class.clone());
                continue;
            }

            let files = match self.storage.list_files(&source_dir) {
                Ok(files) => files,
                Err(err) => {
                    tracing::warn!(path = %source_dir.display(), error = %err, "cannot list raw data folder");
                    report.missing_classes.push(definition.source_class.clone());
                    continue;
                }
            };

            tracing::info!(class = %definition.source_class, files = files.len(), "processing folder");
            for source_path in files {
                if is_eligible(&source_path) {
                    jobs.push(SortJob {
                        source_path,
                        source_class: definition.source_class.clone(),
                    });
                } else {
                    report.ignored += 1;
                }
            }
        }

        report.examined = jobs.len();
        jobs
    }

    fn place(&self, job: &SortJob, result: ClassificationResult) -> Result<Placement, CorpusError> {
        let dest_dir = self.layout.label_dir(&result.output_label);
        let destination = self
            .storage
            .copy_file(&job.source_path, &dest_dir)
            .map_err(|e| CorpusError::storage(&job.source_path, e))?;
        Ok(Placement {
            source_path: job.source_path.clone(),
            destination,
            result,
        })
    }
}
