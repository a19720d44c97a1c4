//! Batch export of many tilesets or maps on a worker pool.
//!
//! Every tileset or map is an independent task with its own output paths, so
//! tasks run in any order and a failing task never stops the others. Map
//! tasks each build their own GID allocator.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::error::ExportError;
use crate::source::{LibraryJob, LibraryLoader, MapLoader};
use crate::tiled::tmx::export_map_from;
use crate::tiled::tsx::{ensure_placeholder, export_tileset_from};
use crate::tiled::{ExportOptions, ExportOutcome};

/// Progress updates: task name and percentage of the batch finished.
pub type ProgressSender = mpsc::Sender<(String, u8)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub name: String,
    /// `source_read`, `write` or `panicked`.
    pub kind: String,
    pub message: String,
}

/// Result of a batch. Names are sorted so reports are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub exported: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.exported.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, name: String, result: Result<ExportOutcome, TaskError>) {
        match result {
            Ok(ExportOutcome::Exported { .. }) => self.exported.push(name),
            Ok(ExportOutcome::Skipped { .. }) => self.skipped.push(name),
            Err(TaskError::Export(e)) => {
                let kind = e.kind().to_string();
                let message = format!("{:#}", anyhow::Error::from(e));
                log::warn!("Export of {} failed: {}", name, message);
                self.failed.push(BatchFailure {
                    name,
                    kind,
                    message,
                });
            }
            Err(TaskError::Panicked(message)) => {
                log::error!("Export of {} panicked: {}", name, message);
                self.failed.push(BatchFailure {
                    name,
                    kind: "panicked".to_string(),
                    message,
                });
            }
        }
    }

    fn sort(&mut self) {
        self.exported.sort();
        self.skipped.sort();
        self.failed.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

enum TaskError {
    Export(ExportError),
    Panicked(String),
}

/// Export every library in `jobs` as a tileset under `out_dir`.
///
/// The shared placeholder image is written before any task starts; failing
/// to write it fails the whole batch. Everything after that is reported per
/// library in the returned [`BatchReport`].
pub async fn export_tilesets(
    loader: Arc<dyn LibraryLoader>,
    jobs: Vec<LibraryJob>,
    out_dir: &Path,
    options: &ExportOptions,
    progress: Option<ProgressSender>,
) -> Result<BatchReport> {
    ensure_placeholder(out_dir, options)?;

    let out_dir = out_dir.to_path_buf();
    let task_options = options.clone();
    let tasks = jobs.into_iter().map(|job| (job.name.clone(), job)).collect();

    Ok(run_batch(tasks, options.workers, progress, move |job: LibraryJob| {
        export_tileset_from(&out_dir, &job, loader.as_ref(), &task_options)
    })
    .await)
}

/// Export every map in `names` under `out_dir`.
pub async fn export_maps(
    loader: Arc<dyn MapLoader>,
    names: Vec<String>,
    out_dir: &Path,
    options: &ExportOptions,
    progress: Option<ProgressSender>,
) -> Result<BatchReport> {
    let out_dir: PathBuf = out_dir.to_path_buf();
    let task_options = options.clone();
    let tasks = names.into_iter().map(|name| (name.clone(), name)).collect();

    Ok(run_batch(tasks, options.workers, progress, move |name: String| {
        export_map_from(&out_dir, &name, loader.as_ref(), &task_options)
    })
    .await)
}

/// Run `task` for every item on blocking worker threads, at most `workers`
/// at a time.
async fn run_batch<T, F>(
    items: Vec<(String, T)>,
    workers: usize,
    progress: Option<ProgressSender>,
    task: F,
) -> BatchReport
where
    T: Send + 'static,
    F: Fn(T) -> Result<ExportOutcome, ExportError> + Send + Sync + 'static,
{
    let total = items.len();
    let task = Arc::new(task);
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();

    for (name, item) in items {
        let task = Arc::clone(&task);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = semaphore.acquire_owned().await;
            let result = tokio::task::spawn_blocking(move || {
                std::panic::catch_unwind(AssertUnwindSafe(|| (*task)(item)))
            })
            .await;

            let result = match result {
                Ok(Ok(outcome)) => outcome.map_err(TaskError::Export),
                Ok(Err(payload)) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
                Err(e) => Err(TaskError::Panicked(e.to_string())),
            };
            (name, result)
        });
    }

    let mut report = BatchReport::default();
    let mut done = 0usize;
    while let Some(joined) = set.join_next().await {
        let (name, result) = match joined {
            Ok(finished) => finished,
            Err(e) => {
                log::error!("Batch task was lost: {}", e);
                continue;
            }
        };
        done += 1;
        if let Some(tx) = &progress {
            let percent = (done * 100 / total.max(1)) as u8;
            // A dropped receiver only means nobody is listening any more.
            let _ = tx.send((name.clone(), percent)).await;
        }
        report.record(name, result);
    }

    report.sort();
    log::info!(
        "Batch finished: {} exported, {} skipped, {} failed",
        report.exported.len(),
        report.skipped.len(),
        report.failed.len()
    );
    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
