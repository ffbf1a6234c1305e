//! Iterator implementations for DataLoader.
//!
//! `DataLoaderIter` is what `DataLoader::iter()` returns. It adapts to the
//! configuration:
//! - `Single`: batches are loaded on the calling thread
//! - `Multi`: a fresh worker pool loads batches ahead and results are
//!   reordered so they come back in sampler order
//!
//! Both variants produce identical batches for the same loader seed and
//! epoch, because every sample seed is derived from `(seed, epoch, index)`.
//!
//! A batch whose sample fails to load yields `Err` and iteration continues
//! with the next batch. A timeout or a lost worker yields one `Err` and ends
//! the epoch.

use anyhow::Result;

use crate::collator::Collator;
use crate::dataloader::workers::batch::load_batch;
use crate::dataset::Dataset;
use crate::minibatch::MiniBatch;

mod multi;

pub(crate) use multi::MultiWorkerIter;

/// Lists of dataset indices, one per batch, in sampler order.
pub(crate) type BatchIndices<'a> = Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>;

pub struct DataLoaderIter<'a, D, C> {
    inner: IteratorImpl<'a, D, C>,
    epoch: usize,
}

enum IteratorImpl<'a, D, C> {
    Single {
        dataset: &'a D,
        collator: &'a C,
        batches: BatchIndices<'a>,
        base_seed: u64,
    },
    Multi(MultiWorkerIter<'a>),
}

impl<'a, D: Dataset, C: Collator> DataLoaderIter<'a, D, C> {
    pub(crate) fn single(
        dataset: &'a D,
        collator: &'a C,
        batches: BatchIndices<'a>,
        base_seed: u64,
        epoch: usize,
    ) -> Self {
        Self {
            inner: IteratorImpl::Single {
                dataset,
                collator,
                batches,
                base_seed,
            },
            epoch,
        }
    }

    pub(crate) fn multi(workers: MultiWorkerIter<'a>, epoch: usize) -> Self {
        Self {
            inner: IteratorImpl::Multi(workers),
            epoch,
        }
    }

    /// The epoch this iterator walks.
    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

impl<D: Dataset, C: Collator> Iterator for DataLoaderIter<'_, D, C> {
    type Item = Result<MiniBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IteratorImpl::Single {
                dataset,
                collator,
                batches,
                base_seed,
            } => {
                let indices = batches.next()?;
                Some(load_batch(*dataset, *collator, &indices, *base_seed, self.epoch))
            }
            IteratorImpl::Multi(workers) => workers.next(),
        }
    }
}
