use crate::collator::Collator;
use crate::sample::{Sample, IMAGE_KEY, LABEL_KEY};
use anyhow::{anyhow, Result};
use ndarray::ArrayD;
use std::collections::HashMap;

/// The `MiniBatch` struct represents a batch of samples grouped for model input.
///
/// It is constructed by stacking multiple [`Sample`]s together along the
/// batch axis (axis 0). Each array has shape `[batch_size, ...]`, where the
/// remaining axes match across all samples.
///
/// # Examples
/// Four samples with `"image"` and `"label"` of shape `[1, 96, 96, 96]`
/// collate into `"image"` and `"label"` arrays of shape `[4, 1, 96, 96, 96]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatch {
    pub tensors: HashMap<String, ArrayD<f32>>,
}

impl MiniBatch {
    /// Collates `samples` with `collator`.
    pub fn collate(samples: Vec<Sample>, collator: impl Collator) -> Result<Self> {
        collator.collate(&samples)
    }

    /// Returns the number of samples in the batch.
    pub fn batch_size(&self) -> Result<usize> {
        self.tensors
            .values()
            .next()
            .map(|t| t.shape()[0])
            .ok_or_else(|| anyhow!("Empty mini-batch"))
    }

    /// Returns a reference to the array for a given feature key.
    pub fn get(&self, feature: &str) -> Result<&ArrayD<f32>> {
        self.tensors
            .get(feature)
            .ok_or_else(|| anyhow!("Feature '{}' not found in mini-batch", feature))
    }

    pub fn image(&self) -> Result<&ArrayD<f32>> {
        self.get(IMAGE_KEY)
    }

    pub fn label(&self) -> Result<&ArrayD<f32>> {
        self.get(LABEL_KEY)
    }

    /// Returns an iterator over all feature keys in the batch.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Splits the batch into `(image, label)` arrays for the training step.
    pub fn into_pair(mut self) -> Result<(ArrayD<f32>, ArrayD<f32>)> {
        let image = self
            .tensors
            .remove(IMAGE_KEY)
            .ok_or_else(|| anyhow!("Feature '{}' not found in mini-batch", IMAGE_KEY))?;
        let label = self
            .tensors
            .remove(LABEL_KEY)
            .ok_or_else(|| anyhow!("Feature '{}' not found in mini-batch", LABEL_KEY))?;
        Ok((image, label))
    }
}
