use crate::volume::Volume;
use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Feature name of the image volume in a paired sample.
pub const IMAGE_KEY: &str = "image";
/// Feature name of the label volume in a paired sample.
pub const LABEL_KEY: &str = "label";

/// The `Sample` struct represents a single example after transformation.
///
/// It maps feature names to volumes. A paired segmentation sample holds
/// `{"image": Volume([1, 96, 96, 96]), "label": Volume([1, 96, 96, 96])}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: HashMap<String, Volume>,
}

impl Sample {
    /// Creates a new `Sample` from a full feature map.
    pub fn new(features: HashMap<String, Volume>) -> Self {
        Self { features }
    }

    /// Creates a `Sample` from a single `(feature_name, volume)` pair.
    ///
    /// Chain with [`with_feature`](Self::with_feature) to add more features.
    pub fn from_single(name: impl Into<String>, volume: Volume) -> Self {
        Self {
            features: HashMap::from([(name.into(), volume)]),
        }
    }

    /// Creates an `{image, label}` sample.
    pub fn from_pair(image: Volume, label: Volume) -> Self {
        Self::from_single(IMAGE_KEY, image).with_feature(LABEL_KEY, label)
    }

    /// Adds or overwrites a feature in the `Sample`.
    pub fn with_feature(mut self, name: impl Into<String>, volume: Volume) -> Self {
        self.features.insert(name.into(), volume);
        self
    }

    /// Returns a reference to the volume by feature name.
    pub fn get(&self, feature: &str) -> Result<&Volume> {
        self.features
            .get(feature)
            .ok_or_else(|| anyhow!("Feature {} not found", feature))
    }

    /// Returns an iterator over all feature names in this `Sample`.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}
