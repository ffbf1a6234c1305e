//! Configuration for DataLoader behaviour
//!
//! Example:
//! ```ignore
//! let config = DataLoaderConfig::builder()
//!     .batch_size(2)
//!     .num_workers(4)
//!     .shuffle(true)
//!     .seed(42)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `num_workers`: More workers overlap decoding and resampling, but each
//!   in-flight batch holds its volumes in memory.
//! - `prefetch_factor`: Batches queued per worker. With large volumes keep it
//!   small, since `num_workers * prefetch_factor` batches may be alive at once.

use crate::error::VolumeError;
use anyhow::{ensure, Result};
use std::time::Duration;

/// Configuration for DataLoader
#[derive(Debug, Clone, PartialEq)]
pub struct DataLoaderConfig {
    /// Number of samples per batch
    pub batch_size: usize,
    /// Number of parallel workers (0 = load on the calling thread)
    pub num_workers: usize,
    /// Whether to drop the last incomplete batch
    pub drop_last: bool,
    /// Whether to reshuffle the dataset every epoch.
    /// Mutually exclusive with providing a sampler.
    pub shuffle: bool,
    /// Base seed for shuffling and per-sample augmentation.
    /// When `None` a seed is drawn once per loader.
    pub seed: Option<u64>,
    /// Number of batches queued per worker (must be > 0 when using workers)
    pub prefetch_factor: usize,
    /// Maximum time to wait for the next batch from workers.
    /// If exceeded, the iterator reports a worker error and stops. Default: 30s
    pub timeout: Duration,
    /// How often idle workers check for the shutdown signal.
    /// Not an error timeout, just a polling interval. Default: 100ms.
    pub worker_timeout: Duration,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            num_workers: 0,
            drop_last: false,
            shuffle: false,
            seed: None,
            prefetch_factor: 2,
            timeout: Duration::from_secs(30),
            worker_timeout: Duration::from_millis(100),
        }
    }
}

impl DataLoaderConfig {
    pub fn builder() -> DataLoaderConfigBuilder {
        DataLoaderConfigBuilder::default()
    }

    /// Rejects settings the loader cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.batch_size > 0,
            VolumeError::InvalidConfig(format!(
                "batch_size must be > 0, but got batch_size={}",
                self.batch_size
            ))
        );
        ensure!(
            self.num_workers == 0 || self.prefetch_factor > 0,
            VolumeError::InvalidConfig(
                "prefetch_factor must be > 0 when num_workers > 0".to_string()
            )
        );
        ensure!(
            !self.timeout.is_zero(),
            VolumeError::InvalidConfig("timeout must be non-zero".to_string())
        );
        ensure!(
            !self.worker_timeout.is_zero(),
            VolumeError::InvalidConfig("worker_timeout must be non-zero".to_string())
        );
        Ok(())
    }
}

/// Builder for DataLoaderConfig with method chaining
#[derive(Debug, Default)]
pub struct DataLoaderConfigBuilder {
    config: DataLoaderConfig,
}

impl DataLoaderConfigBuilder {
    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the number of workers
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    pub fn drop_last(mut self, drop: bool) -> Self {
        self.config.drop_last = drop;
        self
    }

    /// Set whether to shuffle dataset every epoch
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    /// Set the random seed for reproducible data loading.
    ///
    /// When set, this seed controls:
    /// - Data shuffling (if shuffle = true)
    /// - Random transforms, through one derived seed per sample
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn prefetch_factor(mut self, factor: usize) -> Self {
        self.config.prefetch_factor = factor;
        self
    }

    /// Set the timeout for batch operations.
    ///
    /// - Too low: May abort epochs during legitimate heavy resampling
    /// - Too high: Delays detection of stuck workers.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the worker polling interval
    pub fn worker_timeout(mut self, worker_timeout: Duration) -> Self {
        self.config.worker_timeout = worker_timeout;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> DataLoaderConfig {
        self.config
    }
}
