//! Declarative pipeline configuration.
//!
//! A paired pipeline can be described in JSON and built at runtime:
//!
//! ```json
//! {
//!   "image": [
//!     { "name": "AddChannel" },
//!     { "name": "ScaleIntensity" },
//!     { "name": "RandRotate", "range": [-15.0, 15.0], "prob": 0.5 },
//!     { "name": "RandomPatch", "size": [64, 64, 64] }
//!   ],
//!   "label": [
//!     { "name": "AddChannel" },
//!     { "name": "Identity" },
//!     { "name": "RandRotate", "range": [-15.0, 15.0], "prob": 0.5, "interpolation": "nearest" },
//!     { "name": "RandomPatch", "size": [64, 64, 64] }
//!   ]
//! }
//! ```
//!
//! Omitted parameters take the defaults of the corresponding transform.

use crate::error::VolumeError;
use crate::transforms::{
    AddChannel, CenterCrop, Compose, Flip, Identity, Interpolation, NormalizeIntensity,
    PairedPipelines, RandAffine, RandFlip, RandRotate, RandShiftIntensity, RandomPatch, Rotate,
    ScaleIntensity, ThresholdIntensity, Transform,
};
use crate::volume::Volume;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_max() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_prob() -> f64 {
    0.1
}

fn default_axes() -> (usize, usize) {
    (0, 1)
}

/// One step of a pipeline, tagged by transform name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum TransformConfig {
    Identity,
    AddChannel,
    ScaleIntensity {
        #[serde(default)]
        min: f32,
        #[serde(default = "default_max")]
        max: f32,
    },
    NormalizeIntensity {
        #[serde(default)]
        nonzero: bool,
    },
    ThresholdIntensity {
        threshold: f32,
        #[serde(default = "default_true")]
        above: bool,
        #[serde(default)]
        cval: f32,
    },
    RandShiftIntensity {
        offsets: f32,
        #[serde(default = "default_prob")]
        prob: f64,
    },
    Rotate {
        angle: f64,
        #[serde(default = "default_axes")]
        axes: (usize, usize),
        #[serde(default)]
        interpolation: Interpolation,
    },
    RandRotate {
        range: (f64, f64),
        #[serde(default = "default_axes")]
        axes: (usize, usize),
        #[serde(default = "default_prob")]
        prob: f64,
        #[serde(default)]
        interpolation: Interpolation,
    },
    Flip {
        axis: usize,
    },
    RandFlip {
        axis: usize,
        #[serde(default = "default_prob")]
        prob: f64,
    },
    RandomPatch {
        size: [usize; 3],
    },
    CenterCrop {
        size: [usize; 3],
    },
    RandAffine {
        #[serde(default = "default_prob")]
        prob: f64,
        #[serde(default)]
        rotate_range: [f64; 3],
        #[serde(default)]
        translate_range: [f64; 3],
        #[serde(default)]
        scale_range: [f64; 3],
        #[serde(default)]
        spatial_size: Option<[usize; 3]>,
        #[serde(default)]
        interpolation: Interpolation,
    },
}

impl TransformConfig {
    /// Instantiates the transform, validating its parameters.
    pub fn build(&self) -> Result<Box<dyn Transform<Volume, Volume>>> {
        let transform: Box<dyn Transform<Volume, Volume>> = match *self {
            TransformConfig::Identity => Box::new(Identity),
            TransformConfig::AddChannel => Box::new(AddChannel),
            TransformConfig::ScaleIntensity { min, max } => {
                Box::new(ScaleIntensity::new(min, max)?)
            }
            TransformConfig::NormalizeIntensity { nonzero } => {
                Box::new(NormalizeIntensity::new(nonzero))
            }
            TransformConfig::ThresholdIntensity {
                threshold,
                above,
                cval,
            } => Box::new(ThresholdIntensity::new(threshold, above, cval)),
            TransformConfig::RandShiftIntensity { offsets, prob } => {
                Box::new(RandShiftIntensity::new(offsets, prob)?)
            }
            TransformConfig::Rotate {
                angle,
                axes,
                interpolation,
            } => Box::new(Rotate::new(angle, axes, interpolation)?),
            TransformConfig::RandRotate {
                range,
                axes,
                prob,
                interpolation,
            } => Box::new(RandRotate::new(range, axes, prob, interpolation)?),
            TransformConfig::Flip { axis } => Box::new(Flip::new(axis)?),
            TransformConfig::RandFlip { axis, prob } => Box::new(RandFlip::new(axis, prob)?),
            TransformConfig::RandomPatch { size } => Box::new(RandomPatch::new(size)?),
            TransformConfig::CenterCrop { size } => Box::new(CenterCrop::new(size)?),
            TransformConfig::RandAffine {
                prob,
                rotate_range,
                translate_range,
                scale_range,
                spatial_size,
                interpolation,
            } => {
                let mut builder = RandAffine::builder()
                    .prob(prob)
                    .rotate_range(rotate_range)
                    .translate_range(translate_range)
                    .scale_range(scale_range)
                    .interpolation(interpolation);
                if let Some(size) = spatial_size {
                    builder = builder.spatial_size(size);
                }
                Box::new(builder.build()?)
            }
        };
        Ok(transform)
    }
}

/// Image and label step lists, built into a [`PairedPipelines`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub image: Vec<TransformConfig>,
    pub label: Vec<TransformConfig>,
}

impl PipelineConfig {
    /// The usual segmentation recipe: add a channel axis, rescale the image
    /// to `[0, 1]`, then cut the same random patch from both volumes.
    pub fn random_patch(size: [usize; 3]) -> Self {
        Self {
            image: vec![
                TransformConfig::AddChannel,
                TransformConfig::ScaleIntensity { min: 0.0, max: 1.0 },
                TransformConfig::RandomPatch { size },
            ],
            label: vec![
                TransformConfig::AddChannel,
                TransformConfig::Identity,
                TransformConfig::RandomPatch { size },
            ],
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            VolumeError::InvalidConfig(format!("Invalid pipeline configuration: {}", e)).into()
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VolumeError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Failed to parse pipeline file {}", path.display()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline configuration")
    }

    /// Builds both pipelines and checks that they pair up.
    pub fn build(&self) -> Result<PairedPipelines> {
        let image = build_compose(&self.image).context("Invalid image pipeline")?;
        let label = build_compose(&self.label).context("Invalid label pipeline")?;
        PairedPipelines::new(image, label)
    }
}

fn build_compose(steps: &[TransformConfig]) -> Result<Compose> {
    steps.iter().enumerate().try_fold(Compose::new(), |compose, (i, step)| {
        let transform = step
            .build()
            .with_context(|| format!("Step {} ({:?}) has invalid parameters", i, step))?;
        Ok(compose.push_boxed(transform))
    })
}
