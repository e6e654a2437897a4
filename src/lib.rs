// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;
pub mod reporting;
pub mod worker;

use std::path::PathBuf;

// Public exports for external consumers
pub use core::{BatchEvent, ConversionResult, ConvertSettings, JobSpec, Progress};
pub use processing::plan;
pub use reporting::{BatchReporter, BatchSummary};
pub use utils::{ConfigError, ConvertError, ImageFormat};
pub use worker::{BatchOutcome, CancellationToken, WorkerPool};

/// Plans and runs a whole batch.
///
/// Configuration problems are returned before any file is touched; per-file
/// failures end up in the outcome.
pub async fn convert_batch<F>(
    files: &[PathBuf],
    settings: &ConvertSettings,
    cancel: &CancellationToken,
    on_event: F,
) -> Result<BatchOutcome, ConfigError>
where
    F: FnMut(BatchEvent) + Send,
{
    let jobs = plan(files, settings)?;
    let pool = WorkerPool::new(settings.concurrency);
    Ok(pool.run(jobs, cancel, on_event).await)
}
