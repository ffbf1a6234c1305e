//! DataLoader constructors and per-epoch iteration.
//!
//! # Constructor Overview
//!
//! ### Automatic Sampling
//! DataLoader creates the sampler from `config.shuffle`:
//! - If `config.shuffle = false`, DataLoader creates a SequentialSampler.
//! - If `config.shuffle = true`, DataLoader creates a RandomSampler seeded
//!   with the loader seed.
//!
//! **Methods:**
//! - `new()` - Auto-sampling + default StackCollator
//! - `new_with_collator()` - Auto-sampling + custom Collator
//!
//! ### Custom sampling
//! - `new_with_sampler()` - User provided index sampler + default StackCollator
//!
//! Index samplers are wrapped in a `BatchSampler` with the configured
//! `batch_size` and `drop_last`.
//!
//! # Seed Coordination
//!
//! The loader seed drives both shuffling and augmentation: sample `i` of
//! epoch `e` is transformed with `sample_seed(seed, e, i)`. When a custom
//! sampler carries its own seed, pass the same value to the config so a run
//! is reproduced by a single number.

use crate::collator::{Collator, StackCollator};
use crate::dataset::Dataset;
use crate::error::VolumeError;
use crate::sampler::{BatchSampler, RandomSampler, Sampler, SequentialSampler};
use anyhow::{ensure, Context, Result};
use log::{debug, info};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::config::DataLoaderConfig;
use super::iterator::{DataLoaderIter, MultiWorkerIter};
use super::workers::batch::spawn_batch_workers;

// ================================================================================================
// DataLoader
// ================================================================================================
/// Coordinates a [`Dataset`], a sampler, and a [`Collator`] into an epoch of
/// mini-batches.
///
/// # Thread safety:
/// - `DataLoader` itself is Send + Sync and can be shared across threads.
/// - Each call to `iter()` starts a new epoch; several iterators may exist at
///   once and each owns its own worker pool.
///
/// # Type parameters:
/// - `D`: Dataset type
/// - `C`: Collator type (defaults to StackCollator)
pub struct DataLoader<D, C = StackCollator> {
    dataset: Arc<D>,
    collator: Arc<C>,
    config: DataLoaderConfig,
    batch_sampler: Box<dyn Sampler<Item = Vec<usize>>>,
    current_epoch: AtomicUsize,
    seed: u64,
}

impl<D: Dataset + 'static> DataLoader<D, StackCollator> {
    /// Creates a DataLoader with the default StackCollator, sampling
    /// sequentially or shuffled according to `config.shuffle`.
    ///
    /// # Example
    /// ```ignore
    /// let config = DataLoaderConfig::builder()
    ///     .batch_size(2)
    ///     .shuffle(true)
    ///     .seed(42)
    ///     .build();
    /// let loader = DataLoader::new(dataset, config)?;
    /// for batch in loader.iter()? {
    ///     let (image, label) = batch?.into_pair()?;
    /// }
    /// ```
    pub fn new(dataset: D, config: DataLoaderConfig) -> Result<Self> {
        Self::new_with_collator(dataset, config, StackCollator)
    }

    /// Creates a DataLoader that draws indices from a user-provided sampler.
    ///
    /// `config.shuffle` must be false: ordering belongs to the sampler.
    pub fn new_with_sampler<S>(dataset: D, sampler: S, config: DataLoaderConfig) -> Result<Self>
    where
        S: Sampler<Item = usize> + 'static,
    {
        ensure!(
            !config.shuffle,
            VolumeError::InvalidConfig(
                "shuffle=true cannot be combined with a custom sampler; \
                shuffle inside the sampler instead"
                    .to_string()
            )
        );
        config.validate()?;
        let batch_sampler = BatchSampler::new(sampler, config.batch_size, config.drop_last)?;
        let seed = resolve_seed(&config);
        Ok(Self::assemble(
            dataset,
            StackCollator,
            config,
            Box::new(batch_sampler),
            seed,
        ))
    }
}

impl<D: Dataset + 'static, C: Collator + 'static> DataLoader<D, C> {
    /// Creates a DataLoader with a custom collator and automatic sampling.
    pub fn new_with_collator(dataset: D, config: DataLoaderConfig, collator: C) -> Result<Self> {
        config.validate()?;
        let seed = resolve_seed(&config);
        let (batch_size, drop_last) = (config.batch_size, config.drop_last);

        let batch_sampler: Box<dyn Sampler<Item = Vec<usize>>> =
            if config.shuffle && !dataset.is_empty() {
                let sampler = RandomSampler::new(dataset.len(), false, None, seed)
                    .context("Failed to create shuffling sampler")?;
                Box::new(BatchSampler::new(sampler, batch_size, drop_last)?)
            } else {
                let sampler = SequentialSampler::new(dataset.len());
                Box::new(BatchSampler::new(sampler, batch_size, drop_last)?)
            };

        Ok(Self::assemble(dataset, collator, config, batch_sampler, seed))
    }

    fn assemble(
        dataset: D,
        collator: C,
        config: DataLoaderConfig,
        batch_sampler: Box<dyn Sampler<Item = Vec<usize>>>,
        seed: u64,
    ) -> Self {
        info!(
            "DataLoader: {} samples, batch_size={}, num_workers={}, shuffle={}, seed={}",
            dataset.len(),
            config.batch_size,
            config.num_workers,
            config.shuffle,
            seed
        );
        Self {
            dataset: Arc::new(dataset),
            collator: Arc::new(collator),
            config,
            batch_sampler,
            current_epoch: AtomicUsize::new(0),
            seed,
        }
    }

    /// Number of batches in one epoch.
    pub fn len(&self) -> usize {
        self.batch_sampler.iter(self.epoch()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The base seed for shuffling and augmentation (generated if the config
    /// had none).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The epoch the next call to [`iter`](Self::iter) will run.
    pub fn epoch(&self) -> usize {
        self.current_epoch.load(Ordering::Relaxed)
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn config(&self) -> &DataLoaderConfig {
        &self.config
    }

    /// Starts the next epoch.
    ///
    /// With `num_workers > 0` this spawns a fresh worker pool that lives as
    /// long as the returned iterator; dropping the iterator early shuts the
    /// pool down and joins its threads.
    pub fn iter(&self) -> Result<DataLoaderIter<'_, D, C>> {
        let epoch = self.current_epoch.fetch_add(1, Ordering::Relaxed);
        let batches = self.batch_sampler.iter(epoch);
        debug!(
            "Starting epoch {} (num_workers={}, seed={})",
            epoch, self.config.num_workers, self.seed
        );

        if self.config.num_workers == 0 {
            return Ok(DataLoaderIter::single(
                &*self.dataset,
                &*self.collator,
                batches,
                self.seed,
                epoch,
            ));
        }

        let pool = spawn_batch_workers(
            Arc::clone(&self.dataset),
            Arc::clone(&self.collator),
            self.config.num_workers,
            self.config.prefetch_factor,
            self.config.worker_timeout,
            self.seed,
            epoch,
        )
        .with_context(|| format!("Failed to start workers for epoch {}", epoch))?;

        Ok(DataLoaderIter::multi(
            MultiWorkerIter::new(pool, batches, self.config.prefetch_factor, self.config.timeout),
            epoch,
        ))
    }
}

fn resolve_seed(config: &DataLoaderConfig) -> u64 {
    config.seed.unwrap_or_else(|| rand::rng().random())
}
