//! Paired volumetric augmentation and batch loading.
//!
//! Image volumes and their label masks are read from NIfTI files, run
//! through two transform pipelines that share every random geometric draw,
//! and stacked into mini-batches by a deterministic, optionally parallel
//! [`DataLoader`](dataloader::DataLoader).

pub mod collator;
pub mod config;
pub mod dataloader;
pub mod dataset;
pub mod error;
pub mod minibatch;
pub mod readers;
pub mod sample;
pub mod sampler;
pub mod transforms;
pub mod volume;

pub use collator::{Collator, StackCollator};
pub use config::{PipelineConfig, TransformConfig};
pub use dataloader::{DataLoader, DataLoaderConfig};
pub use dataset::{Dataset, FilePairSource, InMemoryPairSource, PairSource, PairedDataset};
pub use error::VolumeError;
pub use minibatch::MiniBatch;
pub use readers::{FileListing, NiftiReader, VolumeReader};
pub use sample::Sample;
pub use transforms::{Compose, PairedPipelines, SampleRng, Transform};
pub use volume::Volume;
