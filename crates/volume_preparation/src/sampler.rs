//! Index samplers: the order in which dataset pairs are visited in an epoch.
//!
//! Every sampler is a pure function of its construction parameters and the
//! epoch number, so the loader can rebuild an epoch's batches on demand and
//! the order never depends on worker scheduling.

use crate::error::VolumeError;
use crate::transforms::rng::epoch_seed;
use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashSet;

/// Produces the visiting order for one epoch.
///
/// `Item` is a dataset index for index samplers and a `Vec` of indices for
/// [`BatchSampler`].
pub trait Sampler: Send + Sync {
    type Item: Send + Sync;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_>;
}

fn shuffle_rng(base_seed: u64, epoch: usize) -> StdRng {
    StdRng::seed_from_u64(epoch_seed(base_seed, epoch))
}

// ============================================================================
// SequentialSampler
// ============================================================================

/// Visits `0..dataset_size` in order, every epoch.
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    dataset_size: usize,
}

impl SequentialSampler {
    pub fn new(dataset_size: usize) -> Self {
        Self { dataset_size }
    }
}

impl Sampler for SequentialSampler {
    type Item = usize;

    fn iter(&self, _epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        Box::new(0..self.dataset_size)
    }
}

// ============================================================================
// RandomSampler
// ============================================================================

/// Uniformly random order over `0..dataset_size`.
///
/// Without replacement each epoch is a permutation truncated to
/// `num_samples`; with replacement `num_samples` independent draws are made.
/// The permutation for epoch `e` is seeded from `(base_seed, e)` with the
/// same mixing as the per-sample augmentation seeds.
///
/// # Example
/// ```ignore
/// let sampler = RandomSampler::new(40, false, None, 7)?;
/// let first: Vec<_> = sampler.iter(0).collect();
/// let second: Vec<_> = sampler.iter(1).collect(); // a different permutation
/// ```
#[derive(Debug, Clone)]
pub struct RandomSampler {
    dataset_size: usize,
    replacement: bool,
    num_samples: usize,
    base_seed: u64,
}

impl RandomSampler {
    pub fn new(
        dataset_size: usize,
        replacement: bool,
        num_samples: Option<usize>,
        base_seed: u64,
    ) -> Result<Self> {
        let num_samples = num_samples.unwrap_or(dataset_size);
        ensure!(
            num_samples > 0,
            VolumeError::InvalidConfig(format!(
                "RandomSampler needs at least one sample to draw (dataset size {})",
                dataset_size
            ))
        );
        ensure!(
            replacement || num_samples <= dataset_size,
            VolumeError::InvalidConfig(format!(
                "Cannot draw {} samples without replacement from {} pairs",
                num_samples, dataset_size
            ))
        );

        Ok(Self {
            dataset_size,
            replacement,
            num_samples,
            base_seed,
        })
    }
}

impl Sampler for RandomSampler {
    type Item = usize;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        let mut rng = shuffle_rng(self.base_seed, epoch);
        if self.replacement {
            let size = self.dataset_size;
            return Box::new((0..self.num_samples).map(move |_| rng.random_range(0..size)));
        }
        let mut order: Vec<usize> = (0..self.dataset_size).collect();
        order.shuffle(&mut rng);
        order.truncate(self.num_samples);
        Box::new(order.into_iter())
    }
}

// ============================================================================
// SubsetRandomSampler
// ============================================================================

/// Shuffles a fixed subset of indices each epoch, e.g. the training split of
/// a cohort whose validation cases live in the same directory.
#[derive(Debug, Clone)]
pub struct SubsetRandomSampler {
    indices: Vec<usize>,
    base_seed: u64,
}

impl SubsetRandomSampler {
    /// Fails on an empty subset, a duplicate, or an index `>= dataset_size`.
    pub fn new(dataset_size: usize, indices: Vec<usize>, base_seed: u64) -> Result<Self> {
        ensure!(
            !indices.is_empty(),
            VolumeError::InvalidConfig("Subset of indices must not be empty".to_string())
        );

        let mut seen = HashSet::with_capacity(indices.len());
        for &index in &indices {
            ensure!(
                index < dataset_size,
                VolumeError::InvalidConfig(format!(
                    "Subset index {} is out of range for {} pairs",
                    index, dataset_size
                ))
            );
            ensure!(
                seen.insert(index),
                VolumeError::InvalidConfig(format!("Subset index {} appears twice", index))
            );
        }
        Ok(Self { indices, base_seed })
    }
}

impl Sampler for SubsetRandomSampler {
    type Item = usize;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        let mut order = self.indices.clone();
        order.shuffle(&mut shuffle_rng(self.base_seed, epoch));
        Box::new(order.into_iter())
    }
}

// ============================================================================
// BatchSampler
// ============================================================================

/// Groups the items of an index sampler into batches of `batch_size`.
///
/// The last batch may be short; with `drop_last` it is discarded instead.
///
/// # Example
/// ```ignore
/// let batches = BatchSampler::new(SequentialSampler::new(5), 2, false)?;
/// let sizes: Vec<_> = batches.iter(0).map(|b| b.len()).collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct BatchSampler<S> {
    sampler: S,
    batch_size: usize,
    drop_last: bool,
}

impl<S: Sampler> BatchSampler<S> {
    pub fn new(sampler: S, batch_size: usize, drop_last: bool) -> Result<Self> {
        ensure!(
            batch_size > 0,
            VolumeError::InvalidConfig("batch_size must be at least 1".to_string())
        );
        Ok(Self {
            sampler,
            batch_size,
            drop_last,
        })
    }
}

impl<S: Sampler> Sampler for BatchSampler<S> {
    type Item = Vec<S::Item>;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_> {
        let mut items = self.sampler.iter(epoch);
        let (batch_size, drop_last) = (self.batch_size, self.drop_last);

        Box::new(std::iter::from_fn(move || {
            let batch: Vec<S::Item> = items.by_ref().take(batch_size).collect();
            let keep = batch.len() == batch_size || (!drop_last && !batch.is_empty());
            keep.then_some(batch)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 42;

    #[test]
    fn test_sequential_order() {
        let sampler = SequentialSampler::new(6);
        assert_eq!(sampler.iter(3).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(SequentialSampler::new(0).iter(0).count(), 0);
    }

    #[test]
    fn test_random_permutation_per_epoch() -> Result<()> {
        let sampler = RandomSampler::new(50, false, None, SEED)?;
        let epoch0: Vec<_> = sampler.iter(0).collect();
        assert_eq!(epoch0, sampler.iter(0).collect::<Vec<_>>());
        assert_ne!(epoch0, sampler.iter(1).collect::<Vec<_>>());

        let mut sorted = epoch0;
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_random_with_replacement_and_truncation() -> Result<()> {
        let draws: Vec<_> = RandomSampler::new(4, true, Some(64), SEED)?.iter(0).collect();
        assert_eq!(draws.len(), 64);
        assert!(draws.iter().all(|&i| i < 4));
        assert!(HashSet::<_>::from_iter(&draws).len() < 64);

        let part: Vec<_> = RandomSampler::new(10, false, Some(3), SEED)?.iter(0).collect();
        assert_eq!(part.len(), 3);
        Ok(())
    }

    #[test]
    fn test_random_rejects_impossible_draws() {
        let err = RandomSampler::new(0, false, None, SEED).unwrap_err();
        assert!(matches!(
            VolumeError::kind_of(&err),
            Some(VolumeError::InvalidConfig(_))
        ));
        assert!(RandomSampler::new(10, false, Some(11), SEED).is_err());
        assert!(RandomSampler::new(10, true, Some(11), SEED).is_ok());
    }

    #[test]
    fn test_subset_shuffles_only_the_subset() -> Result<()> {
        let sampler = SubsetRandomSampler::new(100, (10..30).collect(), SEED)?;
        let epoch1: Vec<_> = sampler.iter(1).collect();
        assert_ne!(epoch1, sampler.iter(2).collect::<Vec<_>>());
        assert_eq!(
            HashSet::<usize>::from_iter(epoch1),
            HashSet::from_iter(10..30)
        );

        assert!(SubsetRandomSampler::new(5, vec![], SEED).is_err());
        assert!(SubsetRandomSampler::new(5, vec![1, 1], SEED).is_err());
        assert!(SubsetRandomSampler::new(5, vec![4, 5], SEED).is_err());
        Ok(())
    }

    #[test]
    fn test_batches_keep_or_drop_tail() -> Result<()> {
        let keep = BatchSampler::new(SequentialSampler::new(7), 3, false)?;
        assert_eq!(
            keep.iter(0).collect::<Vec<_>>(),
            vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]
        );

        let drop = BatchSampler::new(SequentialSampler::new(7), 3, true)?;
        assert_eq!(drop.iter(0).count(), 2);

        let exact = BatchSampler::new(SequentialSampler::new(6), 3, true)?;
        assert_eq!(exact.iter(0).count(), 2);

        assert!(BatchSampler::new(SequentialSampler::new(7), 0, false).is_err());
        Ok(())
    }
}
