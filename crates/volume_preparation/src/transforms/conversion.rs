use crate::sample::Sample;
use crate::transforms::{SampleRng, Transform};
use crate::volume::Volume;
use anyhow::Result;

/// Wraps a volume into a `Sample` with the given feature name.
#[derive(Debug)]
pub struct ToSample {
    feature_name: String,
}

impl ToSample {
    pub fn new(feature_name: impl Into<String>) -> Self {
        Self {
            feature_name: feature_name.into(),
        }
    }
}

impl Transform<Volume, Sample> for ToSample {
    fn apply(&self, volume: Volume, _: &mut SampleRng) -> Result<Sample> {
        Ok(Sample::from_single(&self.feature_name, volume))
    }
}
