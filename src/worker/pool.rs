//! Bounded worker pool and batch scheduler.
//!
//! A dispatcher hands jobs out in input order, one per free worker slot.
//! Each job runs on tokio's blocking pool and reports back over a channel to
//! a single aggregator, the only owner of [`BatchJobState`]. A worker slot is
//! released only after the aggregator has recorded its result, so a
//! cancellation raised from a progress callback is seen before the next job
//! is dispatched.

use std::sync::Arc;
use std::time::Instant;
use serde::Serialize;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::core::{BatchEvent, BatchJobState, ConversionResult, JobSpec, Progress, ProgressType};
use crate::processing::convert_job;
use crate::reporting::{summarize, BatchSummary};
use crate::utils::extract_filename;
use super::cancel::CancellationToken;
use super::error::{WorkerError, WorkerResult};

const DEFAULT_WORKERS: usize = 4;

/// Ceiling for the default worker count; each worker holds decoded images in memory.
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Available hardware parallelism, capped at [`MAX_DEFAULT_WORKERS`].
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_WORKERS)
        .min(MAX_DEFAULT_WORKERS)
}

/// Everything a finished batch leaves behind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Frozen per-job state
    pub state: BatchJobState,
    /// One result per job that ran, in input order
    pub results: Vec<ConversionResult>,
    pub summary: BatchSummary,
}

/// Messages from the dispatcher and jobs to the aggregator.
enum WorkerMessage {
    Started {
        slot: usize,
        file: String,
    },
    Finished {
        slot: usize,
        result: ConversionResult,
        /// Released once the aggregator has recorded the result
        permit: OwnedSemaphorePermit,
    },
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    /// `None` picks [`default_concurrency`]; zero is raised to one.
    pub fn new(worker_count: Option<usize>) -> Self {
        let worker_count = worker_count.unwrap_or_else(default_concurrency).max(1);
        Self { worker_count }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs `jobs` to completion or cancellation.
    ///
    /// `on_event` receives a start event, one progress event per finished
    /// job and a final [`BatchEvent::Finished`]. It is called from the
    /// aggregator and should return quickly. Individual job failures are
    /// recorded, never returned.
    pub async fn run<F>(&self, jobs: Vec<JobSpec>, cancel: &CancellationToken, mut on_event: F) -> BatchOutcome
    where
        F: FnMut(BatchEvent) + Send,
    {
        let started = Instant::now();
        let total = jobs.len();
        let mut state = BatchJobState::new(total);
        let mut results = Vec::with_capacity(total);

        info!("Starting batch of {} jobs on {} workers", total, self.worker_count);
        on_event(BatchEvent::Progress(Progress::new(ProgressType::Start, 0, total, "starting")));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let dispatcher = tokio::spawn(dispatch(jobs, semaphore, cancel.clone(), tx));

        while let Some(message) = rx.recv().await {
            match message {
                WorkerMessage::Started { slot, file } => {
                    state.mark_running(slot);
                    debug!("Job {} started: {} ({} running)", slot, file, state.running());
                }
                WorkerMessage::Finished { slot, result, permit } => {
                    state.record(slot, &result);
                    let progress = progress_for(&state, &result);
                    results.push(result);
                    on_event(BatchEvent::Progress(progress));
                    drop(permit);
                }
            }
        }

        match dispatcher.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Dispatcher stopped early: {}", e),
            Err(e) => warn!("Dispatcher task failed: {}", WorkerError::from(e)),
        }

        state.freeze();
        if state.cancelled() > 0 {
            info!("Batch cancelled; {} jobs never ran", state.cancelled());
        }

        results.sort_by_key(|r| r.index);
        let summary = summarize(&results, state.cancelled(), started.elapsed());
        info!(
            "Batch finished: {} converted, {} failed, {} cancelled in {:?}",
            summary.succeeded, summary.failed, summary.cancelled, summary.elapsed
        );
        on_event(BatchEvent::Finished(summary.clone()));

        BatchOutcome { state, results, summary }
    }
}

/// Hands jobs out in order, one per free slot, until done or cancelled.
async fn dispatch(
    jobs: Vec<JobSpec>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<WorkerMessage>,
) -> WorkerResult<()> {
    for (slot, job) in jobs.into_iter().enumerate() {
        if cancel.is_cancelled() {
            debug!("Cancellation observed before job {}", slot);
            break;
        }
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        // Cancellation may have arrived while waiting for a free slot
        if cancel.is_cancelled() {
            debug!("Cancellation observed before job {}", slot);
            break;
        }

        tx.send(WorkerMessage::Started { slot, file: extract_filename(&job.source) })
            .map_err(|_| WorkerError::ChannelClosed)?;

        let tx = tx.clone();
        tokio::spawn(async move {
            let result = run_job(job).await;
            if tx.send(WorkerMessage::Finished { slot, result, permit }).is_err() {
                warn!("Aggregator gone; result for job {} dropped", slot);
            }
        });
    }
    Ok(())
}

/// Runs the blocking pipeline; a panic becomes a failed result.
async fn run_job(job: JobSpec) -> ConversionResult {
    let index = job.index;
    let source = job.source.clone();
    let started = Instant::now();

    match tokio::task::spawn_blocking(move || convert_job(&job)).await {
        Ok(result) => result,
        Err(e) => {
            let err = WorkerError::from(e);
            warn!("Job for {} died: {}", source.display(), err);
            ConversionResult::failed(index, source, err.into(), started.elapsed())
        }
    }
}

fn progress_for(state: &BatchJobState, result: &ConversionResult) -> Progress {
    let file = extract_filename(&result.source);
    let completed = state.completed();
    let total = state.total();

    match &result.error {
        None => Progress::new(ProgressType::Progress, completed, total, "processing").with_file(file),
        Some(err) => Progress::new(ProgressType::Error, completed, total, "error")
            .with_file(file)
            .with_error(err.to_string()),
    }
}
