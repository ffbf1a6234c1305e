//! Ordered volume pipelines and the image/label pairing contract.

use super::core::Transform;
use super::rng::SampleRng;
use crate::error::VolumeError;
use crate::volume::Volume;
use anyhow::{Context, Result};
use std::fmt;

/// An ordered, immutable list of volume-to-volume steps.
///
/// Applying a `Compose` threads the output of step `i` into step `i + 1`.
/// Step `i` draws from `rng.fork(i)`, so the random parameters a step sees
/// depend only on the sample seed and its position, not on what earlier
/// steps consumed.
///
/// # Example
/// ```ignore
/// let image = Compose::new()
///     .push(AddChannel)
///     .push(ScaleIntensity::default())
///     .push(RandomPatch::new([64, 64, 64])?);
/// let out = image.apply(volume, &mut SampleRng::new(seed))?;
/// ```
#[derive(Default)]
pub struct Compose {
    steps: Vec<Box<dyn Transform<Volume, Volume>>>,
}

impl Compose {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step and returns the extended pipeline.
    pub fn push(mut self, step: impl Transform<Volume, Volume> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends an already boxed step (used when building from configuration).
    pub fn push_boxed(mut self, step: Box<dyn Transform<Volume, Volume>>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// For each position: the step's geometry for spatial steps, `None`
    /// otherwise.
    pub fn spatial_signature(&self) -> Vec<Option<String>> {
        self.steps.iter().map(|s| s.geometry()).collect()
    }
}

impl Transform<Volume, Volume> for Compose {
    fn apply(&self, input: Volume, rng: &mut SampleRng) -> Result<Volume> {
        let mut volume = input;
        for (i, step) in self.steps.iter().enumerate() {
            let mut step_rng = rng.fork(i as u64);
            volume = step
                .apply(volume, &mut step_rng)
                .with_context(|| format!("Step {} ({}) failed", i, step.name()))?;
        }
        Ok(volume)
    }

    fn geometry(&self) -> Option<String> {
        let steps: Vec<String> = self.spatial_signature().into_iter().flatten().collect();
        (!steps.is_empty()).then(|| steps.join(", "))
    }

    fn name(&self) -> &'static str {
        "Compose"
    }
}

impl fmt::Debug for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compose")
            .field("steps", &self.step_names())
            .finish()
    }
}

/// An image pipeline and a label pipeline that are guaranteed to move voxels
/// identically.
///
/// Construction checks that both pipelines have the same length and that at
/// every position either both steps are non-spatial, or both report the same
/// [`geometry`](Transform::geometry): same transform, same angles, axes,
/// probabilities and sizes. Combined with per-position random streams this makes
/// every geometric draw (angle, flip, patch offset, affine parameters) shared
/// between the image and its label, while interpolation and intensity steps
/// can still differ.
#[derive(Debug)]
pub struct PairedPipelines {
    image: Compose,
    label: Compose,
}

impl PairedPipelines {
    pub fn new(image: Compose, label: Compose) -> Result<Self> {
        if image.len() != label.len() {
            return Err(VolumeError::InvalidConfig(format!(
                "Image and label pipelines must have the same number of steps \
                (image: {:?}, label: {:?}). Use Identity to pad non-spatial positions.",
                image.step_names(),
                label.step_names()
            ))
            .into());
        }

        let image_sig = image.spatial_signature();
        let label_sig = label.spatial_signature();
        for (i, (a, b)) in image_sig.iter().zip(label_sig.iter()).enumerate() {
            if a != b {
                return Err(VolumeError::InvalidConfig(format!(
                    "Spatial step mismatch at position {}: image has {}, label has {}",
                    i,
                    a.as_deref().unwrap_or("a non-spatial step"),
                    b.as_deref().unwrap_or("a non-spatial step"),
                ))
                .into());
            }
        }

        Ok(Self { image, label })
    }

    pub fn image(&self) -> &Compose {
        &self.image
    }

    pub fn label(&self) -> &Compose {
        &self.label
    }

    /// Transforms a pair with one seed shared by both pipelines.
    pub fn apply(&self, image: Volume, label: Volume, seed: u64) -> Result<(Volume, Volume)> {
        let image = self
            .image
            .apply(image, &mut SampleRng::new(seed))
            .context("Image pipeline failed")?;
        let label = self
            .label
            .apply(label, &mut SampleRng::new(seed))
            .context("Label pipeline failed")?;
        Ok((image, label))
    }
}
