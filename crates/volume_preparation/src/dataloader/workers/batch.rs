//! Batch loading shared by the single-threaded path and the worker threads.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::pool::WorkerPool;
use super::WORKER_THREAD_NAME;
use crate::collator::Collator;
use crate::dataloader::common::thread::current_worker_id;
use crate::dataset::Dataset;
use crate::error::VolumeError;
use crate::minibatch::MiniBatch;
use crate::sample::Sample;
use crate::transforms::sample_seed;

/// One batch of dataset indices, tagged with its position in the epoch.
#[derive(Debug)]
pub(crate) struct BatchTask {
    pub(crate) batch_index: usize,
    pub(crate) indices: Vec<usize>,
}

/// A finished batch, tagged with the position of the task it answers.
pub(crate) type BatchOutput = (usize, Result<MiniBatch>);

/// Loads and collates the samples of one batch.
///
/// Sample `index` is seeded with `sample_seed(base_seed, epoch, index)`, so
/// the result does not depend on the thread that runs it.
pub(crate) fn load_batch<D, C>(
    dataset: &D,
    collator: &C,
    indices: &[usize],
    base_seed: u64,
    epoch: usize,
) -> Result<MiniBatch>
where
    D: Dataset + ?Sized,
    C: Collator + ?Sized,
{
    let samples = indices
        .iter()
        .map(|&index| {
            dataset
                .get_sample(index, sample_seed(base_seed, epoch, index))
                .with_context(|| {
                    format!(
                        "Failed to load sample at index {} (dataset size: {})",
                        index,
                        dataset.len()
                    )
                })
        })
        .collect::<Result<Vec<Sample>>>()?;

    collator
        .collate(&samples)
        .with_context(|| format!("Failed to collate batch of {} samples", samples.len()))
}

/// Runs [`load_batch`] and turns a panic into a `Worker` error.
fn load_batch_catching<D, C>(
    dataset: &D,
    collator: &C,
    task: &BatchTask,
    base_seed: u64,
    epoch: usize,
) -> Result<MiniBatch>
where
    D: Dataset,
    C: Collator,
{
    panic::catch_unwind(AssertUnwindSafe(|| {
        load_batch(dataset, collator, &task.indices, base_seed, epoch)
    }))
    .unwrap_or_else(|payload| {
        Err(VolumeError::Worker(format!(
            "worker {} panicked while loading batch {}: {}",
            current_worker_id().map_or_else(|| "?".to_string(), |id| id.to_string()),
            task.batch_index,
            panic_message(payload.as_ref())
        ))
        .into())
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Spawns a fresh pool of loader workers for one epoch.
///
/// Workers answer tasks in the order they receive them and exit once their
/// task channel closes or the pool shuts down.
pub(crate) fn spawn_batch_workers<D, C>(
    dataset: Arc<D>,
    collator: Arc<C>,
    num_workers: usize,
    prefetch_factor: usize,
    worker_timeout: Duration,
    base_seed: u64,
    epoch: usize,
) -> Result<WorkerPool<BatchTask, BatchOutput>>
where
    D: Dataset + 'static,
    C: Collator + 'static,
{
    debug!(
        "Spawning {} loader workers for epoch {} (prefetch_factor={})",
        num_workers, epoch, prefetch_factor
    );
    WorkerPool::new(
        WORKER_THREAD_NAME,
        num_workers,
        prefetch_factor,
        move |task_rx: Receiver<BatchTask>, output_tx: Sender<BatchOutput>, shutdown| {
            while !shutdown.load(Ordering::Relaxed) {
                match task_rx.recv_timeout(worker_timeout) {
                    Ok(task) => {
                        trace!(
                            "worker {:?} loading batch {} ({} samples)",
                            current_worker_id(),
                            task.batch_index,
                            task.indices.len()
                        );
                        let result =
                            load_batch_catching(&*dataset, &*collator, &task, base_seed, epoch);
                        if output_tx.send((task.batch_index, result)).is_err() {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            trace!("worker {:?} exiting", current_worker_id());
        },
    )
}
