use crate::error::VolumeError;
use crate::readers::{FileListing, NiftiReader, VolumeReader};
use crate::sample::Sample;
use crate::transforms::PairedPipelines;
use crate::volume::Volume;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Where raw `(image, label)` pairs come from.
///
/// Implementations must be `Send + Sync` so a single source can be shared
/// by every loader worker.
pub trait PairSource: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads pair `index` (callers check the bound).
    fn load(&self, index: usize) -> Result<(Volume, Volume)>;
}

/// Pairs decoded from files on every access.
///
/// Nothing is cached: each `load` reads both files again, so memory use
/// stays at one pair per in-flight sample.
#[derive(Debug, Clone)]
pub struct FilePairSource<R: VolumeReader = NiftiReader> {
    listing: FileListing,
    reader: R,
}

impl FilePairSource<NiftiReader> {
    pub fn nifti(listing: FileListing) -> Self {
        Self::new(listing, NiftiReader)
    }
}

impl<R: VolumeReader> FilePairSource<R> {
    pub fn new(listing: FileListing, reader: R) -> Self {
        Self { listing, reader }
    }

    pub fn listing(&self) -> &FileListing {
        &self.listing
    }
}

impl<R: VolumeReader> PairSource for FilePairSource<R> {
    fn len(&self) -> usize {
        self.listing.len()
    }

    fn load(&self, index: usize) -> Result<(Volume, Volume)> {
        let (image_path, label_path) = self.listing.get(index).ok_or(VolumeError::Index {
            index,
            len: self.listing.len(),
        })?;
        let image = self
            .reader
            .read(image_path)
            .with_context(|| format!("Failed to read image {}", image_path.display()))?;
        let label = self
            .reader
            .read(label_path)
            .with_context(|| format!("Failed to read label {}", label_path.display()))?;
        Ok((image, label))
    }
}

/// Pairs already held in memory, shared behind an `Arc`.
///
/// Cloning the source only bumps the reference count.
#[derive(Debug, Clone)]
pub struct InMemoryPairSource {
    pairs: Arc<[(Volume, Volume)]>,
}

impl InMemoryPairSource {
    pub fn new(pairs: Vec<(Volume, Volume)>) -> Self {
        Self {
            pairs: pairs.into(),
        }
    }
}

impl PairSource for InMemoryPairSource {
    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn load(&self, index: usize) -> Result<(Volume, Volume)> {
        self.pairs.get(index).cloned().ok_or_else(|| {
            VolumeError::Index {
                index,
                len: self.pairs.len(),
            }
            .into()
        })
    }
}

/// A `Dataset` provides random access to transformed samples.
///
/// The caller supplies the seed for each access, so the same `(index, seed)`
/// always produces the same sample no matter which thread asks.
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_sample(&self, index: usize, seed: u64) -> Result<Sample>;
}

/// Loads raw pairs from a [`PairSource`] and runs them through
/// [`PairedPipelines`], yielding `{image, label}` samples.
///
/// # Example
/// ```ignore
/// let listing = FileListing::from_patterns("./data", "im*.nii.gz", "seg*.nii.gz", false)?;
/// let dataset = PairedDataset::new(FilePairSource::nifti(listing), pipelines);
/// let sample = dataset.get(0)?;
/// ```
pub struct PairedDataset<S: PairSource> {
    source: S,
    pipelines: PairedPipelines,
    metadata: HashMap<String, String>,
}

impl<S: PairSource> PairedDataset<S> {
    pub fn new(source: S, pipelines: PairedPipelines) -> Self {
        Self {
            source,
            pipelines,
            metadata: HashMap::new(),
        }
    }

    /// Adds/updates metadata and returns the modified dataset.
    /// Enables chaining: `dataset.with_metadata("split", "train")`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a metadata field, if it exists.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn pipelines(&self) -> &PairedPipelines {
        &self.pipelines
    }

    /// Sample `index` transformed with seed `index`, for ad-hoc inspection.
    pub fn get(&self, index: usize) -> Result<Sample> {
        self.get_sample(index, index as u64)
    }
}

impl<S: PairSource> Dataset for PairedDataset<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get_sample(&self, index: usize, seed: u64) -> Result<Sample> {
        let len = self.source.len();
        if index >= len {
            return Err(VolumeError::Index { index, len }.into());
        }
        let (image, label) = self.source.load(index)?;
        let (image, label) = self.pipelines.apply(image, label, seed)?;
        Ok(Sample::from_pair(image, label))
    }
}
