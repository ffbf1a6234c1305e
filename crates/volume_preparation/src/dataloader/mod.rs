//! This module implements the `DataLoader`.
//!
//! The `DataLoader` coordinates a `Dataset`, a `Sampler`, and a `Collator` to
//! turn paired volumes into training mini-batches, optionally on worker
//! threads.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌────────────┐
//!                 │ PairSource │ (NIfTI files or in-memory arrays)
//!                 └─────┬──────┘
//!                       │ raw (image, label)
//!                       ↓
//!              ┌─────────────────┐
//!              │ PairedPipelines │ (same seed for image and label)
//!              └────────┬────────┘
//!                       │ Sample {image, label}
//!                       ↓
//!                  ┌─────────┐
//!                  │ Sampler │ (defines iteration order)
//!                  └────┬────┘
//!                       │ batch indices
//!                       ↓
//!               ┌──────────────┐
//!               │  DataLoader  │ ←───── Config (batch_size, workers, seed)
//!               └──────┬───────┘
//!                      │
//!                [Worker Threads] (optional, results reordered)
//!                      │
//!                      ↓
//!                 ┌──────────┐
//!                 │ Collator │ (stacks samples along a new batch axis)
//!                 └────┬─────┘
//!                      ↓
//!                ┌───────────┐
//!                │ MiniBatch │
//!                └───────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/dataloader/
//! ├── mod.rs             # Public API exports + module-level docs
//! ├── config.rs          # DataLoaderConfig, builder, and validation
//! ├── loader.rs          # DataLoader struct, constructors, iter()
//! ├── iterator/
//! │   ├── mod.rs         # DataLoaderIter and the single-threaded path
//! │   └── multi.rs       # Worker dispatch and in-order reassembly
//! ├── workers/
//! │   ├── mod.rs         # Worker constants
//! │   ├── pool.rs        # Generic `WorkerPool<Task, Output>`
//! │   └── batch.rs       # Batch tasks and the worker loop
//! └── common/
//!     ├── mod.rs
//!     └── thread.rs      # Thread-local worker ID
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let listing = FileListing::from_patterns("./data", "im*.nii.gz", "seg*.nii.gz", false)?;
//! let dataset = PairedDataset::new(FilePairSource::nifti(listing), pipelines);
//! let config = DataLoaderConfig::builder()
//!     .batch_size(2)
//!     .num_workers(4)
//!     .shuffle(true)
//!     .seed(42)
//!     .build();
//!
//! let loader = DataLoader::new(dataset, config)?;
//! for epoch in 0..10 {
//!     for batch in loader.iter()? {
//!         let (image, label) = batch?.into_pair()?;
//!     }
//! }
//! ```
//!
//! # Determinism
//!
//! Sample `i` of epoch `e` is always augmented with
//! `sample_seed(loader_seed, e, i)`, so the worker count changes throughput
//! but never the batches.
//!
//! # Memory Usage
//! - Single-threaded: O(batch_size) volumes
//! - Multi-threaded: O(num_workers x prefetch_factor x batch_size) volumes

mod common;
mod config;
mod iterator;
mod loader;
mod workers;

pub use common::thread::{current_worker_id, WORKER_ID};
pub use config::{DataLoaderConfig, DataLoaderConfigBuilder};
pub use iterator::DataLoaderIter;
pub use loader::DataLoader;
