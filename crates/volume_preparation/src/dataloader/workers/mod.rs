//! Worker management for parallel data loading.
//!
//! - `pool`: Generic worker pool with per-worker task channels
//! - `batch`: Batch tasks and the loop each loader worker runs

pub(crate) mod batch;
pub(crate) mod pool;

/// Prefix of loader worker thread names (`volume-loader-worker-{id}`).
pub(crate) const WORKER_THREAD_NAME: &str = "volume-loader-worker";
