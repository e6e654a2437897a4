mod cancel;
mod error;
mod pool;

pub use cancel::CancellationToken;
pub use error::{WorkerError, WorkerResult};
pub use pool::{default_concurrency, BatchOutcome, WorkerPool, MAX_DEFAULT_WORKERS};
