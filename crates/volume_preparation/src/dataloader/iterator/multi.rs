//! Multi-worker iteration with in-order delivery.

use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::time::Duration;

use super::BatchIndices;
use crate::dataloader::workers::batch::{BatchOutput, BatchTask};
use crate::dataloader::workers::pool::WorkerPool;
use crate::error::VolumeError;
use crate::minibatch::MiniBatch;

/// Feeds batches to a fresh worker pool and hands results back in order.
///
/// Batch `b` always goes to worker `b % num_workers`. At most
/// `prefetch_factor * num_workers` batches are in flight, which bounds both
/// the per-worker queues and the reorder buffer. Results that arrive early
/// wait in `reorder` until every earlier batch has been yielded.
pub(crate) struct MultiWorkerIter<'a> {
    pool: Option<WorkerPool<BatchTask, BatchOutput>>,
    batches: BatchIndices<'a>,
    next_to_send: usize,
    next_to_yield: usize,
    max_in_flight: usize,
    exhausted: bool,
    reorder: BTreeMap<usize, Result<MiniBatch>>,
    timeout: Duration,
}

impl<'a> MultiWorkerIter<'a> {
    pub(crate) fn new(
        pool: WorkerPool<BatchTask, BatchOutput>,
        batches: BatchIndices<'a>,
        prefetch_factor: usize,
        timeout: Duration,
    ) -> Self {
        let max_in_flight = prefetch_factor * pool.num_workers();
        Self {
            pool: Some(pool),
            batches,
            next_to_send: 0,
            next_to_yield: 0,
            max_in_flight,
            exhausted: false,
            reorder: BTreeMap::new(),
            timeout,
        }
    }

    fn in_flight(&self) -> usize {
        self.next_to_send - self.next_to_yield
    }

    /// Tops the worker queues up to `max_in_flight` batches.
    fn dispatch(&mut self) -> Result<()> {
        while !self.exhausted && self.in_flight() < self.max_in_flight {
            let Some(indices) = self.batches.next() else {
                self.exhausted = true;
                break;
            };
            let Some(pool) = self.pool.as_ref() else {
                break;
            };
            let batch_index = self.next_to_send;
            pool.send_to(batch_index, BatchTask { batch_index, indices })
                .map_err(|_| {
                    VolumeError::Worker(format!(
                        "worker {} stopped before receiving batch {}",
                        batch_index % pool.num_workers(),
                        batch_index
                    ))
                })?;
            self.next_to_send += 1;
        }
        Ok(())
    }

    /// Waits until the batch at `next_to_yield` has arrived.
    fn receive_next(&mut self) -> Result<Result<MiniBatch>> {
        loop {
            if let Some(result) = self.reorder.remove(&self.next_to_yield) {
                self.next_to_yield += 1;
                return Ok(result);
            }
            let Some(pool) = self.pool.as_ref() else {
                return Err(VolumeError::Worker("worker pool already shut down".into()).into());
            };
            match pool.recv_timeout(self.timeout) {
                Ok((batch_index, result)) => {
                    self.reorder.insert(batch_index, result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(VolumeError::Worker(format!(
                        "Timed out after {:?} waiting for batch {}",
                        self.timeout, self.next_to_yield
                    ))
                    .into());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(VolumeError::Worker(format!(
                        "All workers disconnected while waiting for batch {}",
                        self.next_to_yield
                    ))
                    .into());
                }
            }
        }
    }

    /// Drops the pool, joining every worker thread.
    fn shut_down(&mut self) {
        if self.pool.take().is_some() {
            debug!("Worker pool shut down after {} batches", self.next_to_yield);
        }
    }
}

impl Iterator for MultiWorkerIter<'_> {
    type Item = Result<MiniBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pool.as_ref()?;

        if let Err(err) = self.dispatch() {
            warn!("{:#}", err);
            self.shut_down();
            return Some(Err(err));
        }

        if self.in_flight() == 0 {
            self.shut_down();
            return None;
        }

        match self.receive_next() {
            Ok(result) => Some(result),
            Err(err) => {
                warn!("{:#}", err);
                self.shut_down();
                Some(Err(err))
            }
        }
    }
}
