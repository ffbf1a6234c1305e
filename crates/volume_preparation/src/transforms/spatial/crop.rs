use crate::error::VolumeError;
use crate::transforms::{SampleRng, Transform};
use crate::volume::Volume;
use anyhow::{ensure, Result};
use ndarray::s;

fn check_size(size: [usize; 3]) -> Result<()> {
    ensure!(
        size.iter().all(|&p| p > 0),
        VolumeError::InvalidConfig(format!(
            "Crop size must be positive on every axis (got {:?})",
            size
        ))
    );
    Ok(())
}

fn check_fits(name: &str, size: [usize; 3], input: &Volume) -> Result<()> {
    let spatial = input.spatial_shape();
    if size.iter().zip(spatial.iter()).any(|(p, s)| p > s) {
        return Err(VolumeError::Shape(format!(
            "{} size {:?} exceeds input spatial shape {:?}",
            name, size, spatial
        ))
        .into());
    }
    Ok(())
}

fn crop(input: &Volume, offset: [usize; 3], size: [usize; 3]) -> Result<Volume> {
    let view = input.channels_view();
    let patch = view.slice(s![
        ..,
        offset[0]..offset[0] + size[0],
        offset[1]..offset[1] + size[1],
        offset[2]..offset[2] + size[2]
    ]);
    input.with_layout_of(patch.to_owned().into_dyn())
}

// ============================================================================
// RandomPatch
// ============================================================================

/// Extracts a fixed-size patch at a uniformly random offset.
///
/// Each axis offset is drawn from `0..=s - p`. A patch larger than the input
/// on any axis is a `Shape` error; nothing is padded.
///
/// # Example
/// ```ignore
/// let patch = RandomPatch::new([64, 64, 64])?;
/// let cropped = patch.apply(volume, &mut rng)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RandomPatch {
    size: [usize; 3],
}

impl RandomPatch {
    pub fn new(size: [usize; 3]) -> Result<Self> {
        check_size(size)?;
        Ok(Self { size })
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }
}

impl Transform<Volume, Volume> for RandomPatch {
    fn apply(&self, input: Volume, rng: &mut SampleRng) -> Result<Volume> {
        check_fits("Patch", self.size, &input)?;
        let spatial = input.spatial_shape();
        let mut offset = [0usize; 3];
        for axis in 0..3 {
            offset[axis] = rng.gen_range_usize(0, spatial[axis] - self.size[axis] + 1);
        }
        crop(&input, offset, self.size)
    }

    fn geometry(&self) -> Option<String> {
        Some(format!("RandomPatch(size={:?})", self.size))
    }
}

// ============================================================================
// CenterCrop
// ============================================================================

/// Crops the centred region of `size` voxels.
#[derive(Debug, Clone, Copy)]
pub struct CenterCrop {
    size: [usize; 3],
}

impl CenterCrop {
    pub fn new(size: [usize; 3]) -> Result<Self> {
        check_size(size)?;
        Ok(Self { size })
    }
}

impl Transform<Volume, Volume> for CenterCrop {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        check_fits("Crop", self.size, &input)?;
        let spatial = input.spatial_shape();
        let offset = [0, 1, 2].map(|axis| (spatial[axis] - self.size[axis]) / 2);
        crop(&input, offset, self.size)
    }

    fn geometry(&self) -> Option<String> {
        Some(format!("CenterCrop(size={:?})", self.size))
    }
}
