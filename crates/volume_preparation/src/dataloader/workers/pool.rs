//! Worker pool implementation for parallel data loading.
//!
//! Manages worker lifecycle, task routing, and result collection.
//!
//! # Key features
//! - Bounded channels prevent memory bloat
//! - One task channel per worker, so the caller decides which worker runs
//!   which task
//! - Shutdown on drop never blocks, even when workers are stuck sending
//! - Thread-local worker IDs for logging

use anyhow::{ensure, Context, Result};
use crossbeam_channel::{bounded, never, Receiver, RecvTimeoutError, SendError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::dataloader::common::thread::set_worker_id;

/// Thread pool for parallel data loading.
///
/// Communication runs through bounded channels:
/// - Task channels: Main thread -> Worker `i` (one per worker)
/// - Output channel: Workers -> Main thread (shared)
/// - Shutdown flag: Enables graceful termination
///
/// # Type Parameters
/// - `Task`: Work items sent to workers
/// - `Output`: Results returned from workers
pub(crate) struct WorkerPool<Task, Output> {
    workers: Vec<thread::JoinHandle<()>>,
    task_txs: Vec<Sender<Task>>,
    output_rx: Receiver<Output>,
    shutdown: Arc<AtomicBool>,
}

impl<Task, Output> WorkerPool<Task, Output>
where
    Task: Send + 'static,
    Output: Send + 'static,
{
    /// Spawns `num_workers` threads named `{name}-{id}`.
    ///
    /// Each task channel holds `buffer_size` tasks; the output channel holds
    /// `buffer_size * num_workers` results, so every task that can be queued
    /// has room for its result.
    pub(crate) fn new<F>(
        name: &str,
        num_workers: usize,
        buffer_size: usize,
        worker_fn: F,
    ) -> Result<Self>
    where
        F: Fn(Receiver<Task>, Sender<Output>, Arc<AtomicBool>) + Send + Sync + 'static,
    {
        ensure!(
            num_workers > 0,
            "Cannot create WorkerPool with 0 workers. \
            Either set num_workers > 0 or use single-threaded mode."
        );
        ensure!(
            buffer_size > 0,
            "Cannot create WorkerPool with buffer_size 0. \
            Buffer size must be > 0 to prevent deadlocks."
        );

        let (output_tx, output_rx) = bounded(buffer_size * num_workers);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_fn = Arc::new(worker_fn);

        let mut pool = Self {
            workers: Vec::with_capacity(num_workers),
            task_txs: Vec::with_capacity(num_workers),
            output_rx,
            shutdown,
        };

        for worker_id in 0..num_workers {
            let (task_tx, task_rx) = bounded(buffer_size);
            let output_tx = output_tx.clone();
            let shutdown = pool.shutdown.clone();
            let worker_fn = worker_fn.clone();

            // On failure `pool` drops here and joins the threads already spawned.
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, worker_id))
                .spawn(move || {
                    set_worker_id(worker_id);
                    worker_fn(task_rx, output_tx, shutdown);
                })
                .with_context(|| format!("Failed to spawn worker thread {}", worker_id))?;

            pool.task_txs.push(task_tx);
            pool.workers.push(handle);
        }

        Ok(pool)
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.task_txs.len()
    }

    /// Queues `task` on worker `worker_id`, blocking while its queue is full.
    pub(crate) fn send_to(&self, worker_id: usize, task: Task) -> Result<(), SendError<Task>> {
        self.task_txs[worker_id % self.task_txs.len()].send(task)
    }

    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Result<Output, RecvTimeoutError> {
        self.output_rx.recv_timeout(timeout)
    }
}

impl<Task, Output> Drop for WorkerPool<Task, Output> {
    fn drop(&mut self) {
        // Signal shutdown to all workers
        self.shutdown.store(true, Ordering::Relaxed);

        // Close the task channels so idle workers wake up
        self.task_txs.clear();

        // Disconnect the output channel so workers blocked on a full
        // output queue get an error instead of waiting forever.
        self.output_rx = never();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("A loader worker thread panicked during shutdown");
            }
        }
    }
}
