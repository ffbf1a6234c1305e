use crate::error::VolumeError;
use crate::minibatch::MiniBatch;
use crate::sample::Sample;
use anyhow::{bail, Result};
use ndarray::{stack, ArrayViewD, Axis};
use std::collections::{BTreeSet, HashMap};

/// A `Collator` defines how to combine multiple [`Sample`]s into a [`MiniBatch`].
pub trait Collator: Send + Sync {
    fn collate(&self, samples: &[Sample]) -> Result<MiniBatch>;
}

/// A `Collator` that stacks volumes with identical shapes along a new
/// batch axis 0, giving `[batch, channel, X, Y, Z]` for channel-first
/// volumes. Nothing is padded: a shape mismatch is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackCollator;

impl Collator for StackCollator {
    fn collate(&self, samples: &[Sample]) -> Result<MiniBatch> {
        if samples.is_empty() {
            bail!("Cannot collate empty sample list");
        }

        // Every sample must carry exactly the features of the first one
        let expected: BTreeSet<&str> = samples[0].features().collect();
        for (i, sample) in samples.iter().enumerate().skip(1) {
            let found: BTreeSet<&str> = sample.features().collect();
            if found != expected {
                bail!(
                    "Sample {} of the batch carries features {:?}, but sample 0 carries {:?}",
                    i,
                    found,
                    expected
                );
            }
        }

        // Stack volumes for each feature
        let mut tensors = HashMap::with_capacity(expected.len());
        for key in expected {
            let views: Vec<ArrayViewD<'_, f32>> = samples
                .iter()
                .map(|s| s.features[key].data().view())
                .collect();

            let reference_shape = views[0].shape();
            for (i, view) in views.iter().enumerate() {
                if view.shape() != reference_shape {
                    return Err(VolumeError::Shape(format!(
                        "Shape mismatch in sample {} for feature '{}': expected {:?}, got {:?}",
                        i,
                        key,
                        reference_shape,
                        view.shape()
                    ))
                    .into());
                }
            }

            let stacked = stack(Axis(0), &views)
                .map_err(|e| VolumeError::Shape(format!("Cannot stack feature '{}': {}", key, e)))?;
            tensors.insert(key.to_string(), stacked);
        }
        Ok(MiniBatch { tensors })
    }
}
