// THEORY:
// Classifying a corpus is embarrassingly parallel: no image's result depends
// on another's. The `WorkerPool` exploits that with the usual tokio layout:
//
// 1.  A single dispatcher task receives every submitted `ClassificationTask`
//     and hands them round-robin to N worker tasks over unbounded channels.
// 2.  Each worker reads the file through `CorpusStorage`, decodes it and runs
//     the pure classification pipeline on the blocking thread pool, then
//     answers on the task's oneshot channel.
// 3.  Workers share only read-only state: the `SeverityPipeline` (config and
//     class table) and the storage handle. Nothing is written by a worker, so
//     no locking is needed. Placing files is left to whoever submitted the
//     task.
//
// A lost worker or a closed pool fails only the task concerned, with a
// `CorpusError::Worker`.

use crate::core_modules::utils::image_helper::image_helper::decode_image;
use crate::corpus::storage::CorpusStorage;
use crate::error::{ClassificationError, CorpusError};
use crate::pipeline::{ClassificationResult, SeverityPipeline};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// What to do with an image that cannot be measured (undecodable or zero-sized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeFailurePolicy {
    /// Report the file as `InvalidImage` and leave it out of the output.
    #[default]
    Skip,
    /// Treat the file as spot-free (ratio 0.0) and place it in the mild bucket.
    TreatAsClean,
}

/// One eligible file of one source class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortJob {
    pub source_path: PathBuf,
    pub source_class: String,
}

pub type JobOutcome = Result<ClassificationResult, CorpusError>;

pub struct ClassificationTask {
    pub job: SortJob,
    pub result_sender: oneshot::Sender<JobOutcome>,
}

/// The read-only state every worker needs.
#[derive(Clone)]
pub struct WorkerContext {
    pub pipeline: Arc<SeverityPipeline>,
    pub storage: Arc<dyn CorpusStorage>,
    pub policy: DecodeFailurePolicy,
}

impl WorkerContext {
    /// Reads, decodes and classifies one file. Runs to completion without suspending.
    pub fn run(&self, job: &SortJob) -> JobOutcome {
        let bytes = self
            .storage
            .read_file(&job.source_path)
            .map_err(|e| CorpusError::storage(&job.source_path, e))?;

        let measured = decode_image(&bytes).and_then(|grid| self.pipeline.classify(&grid, &job.source_class));

        match measured {
            Err(ClassificationError::InvalidImage(reason)) if self.policy == DecodeFailurePolicy::TreatAsClean => {
                tracing::warn!(
                    path = %job.source_path.display(),
                    %reason,
                    "image could not be measured; treating it as spot-free"
                );
                Ok(self.pipeline.classify_unmeasured(&job.source_class)?)
            }
            other => Ok(other?),
        }
    }
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<ClassificationTask>,
    dispatcher: tokio::task::JoinHandle<()>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers (at least one). Must be called inside a tokio runtime.
    pub fn new(context: WorkerContext, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ClassificationTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<ClassificationTask>())
            .unzip();

        // Spawn dispatcher
        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    let _ = task
                        .result_sender
                        .send(Err(CorpusError::Worker("worker is no longer running".to_string())));
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        // Spawn workers
        let workers = worker_receivers
            .into_iter()
            .map(|mut worker_receiver| {
                let worker_context = context.clone();
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let ctx = worker_context.clone();
                        let job = task.job;
                        let outcome = tokio::task::spawn_blocking(move || ctx.run(&job))
                            .await
                            .unwrap_or_else(|e| Err(CorpusError::Worker(format!("classification task failed: {e}"))));
                        let _ = task.result_sender.send(outcome);
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            dispatcher,
            workers,
        }
    }

    /// A pool sized to the number of CPUs.
    pub fn with_default_size(context: WorkerContext) -> Self {
        Self::new(context, num_cpus::get())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues `job` and waits for its outcome.
    pub async fn submit(&self, job: SortJob) -> JobOutcome {
        let (result_sender, result_receiver) = oneshot::channel();

        self.task_sender
            .send(ClassificationTask { job, result_sender })
            .map_err(|_| CorpusError::Worker("worker pool is shut down".to_string()))?;

        result_receiver
            .await
            .map_err(|_| CorpusError::Worker("worker dropped the task".to_string()))?
    }

    /// Closes the queue and waits for every task to finish.
    pub async fn shutdown(self) {
        let WorkerPool {
            task_sender,
            dispatcher,
            workers,
        } = self;
        drop(task_sender);
        let _ = dispatcher.await;
        for worker in workers {
            let _ = worker.await;
        }
    }
}
