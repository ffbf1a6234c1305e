use super::{resample, Affine3, Interpolation};
use crate::error::VolumeError;
use crate::transforms::{SampleRng, Transform};
use crate::volume::Volume;
use anyhow::{ensure, Result};

fn check_axes(axes: (usize, usize)) -> Result<()> {
    ensure!(
        axes.0 < 3 && axes.1 < 3 && axes.0 != axes.1,
        VolumeError::InvalidConfig(format!(
            "Rotation axes must be two distinct spatial axes in 0..3 (got {:?})",
            axes
        ))
    );
    Ok(())
}

fn rotate(
    volume: &Volume,
    axes: (usize, usize),
    degrees: f64,
    interpolation: Interpolation,
) -> Result<Volume> {
    // Output voxels are pulled back through the inverse rotation.
    let inverse = Affine3::rotation(axes, -degrees.to_radians());
    resample(volume, &inverse, volume.spatial_shape(), interpolation)
}

// ============================================================================
// Rotate
// ============================================================================

/// Rotates about the volume centre in the plane of two spatial axes.
///
/// The output keeps the input shape; corners rotated in from outside the
/// volume are zero.
///
/// # Example
/// ```ignore
/// let rotate = Rotate::new(90.0, (0, 1), Interpolation::Trilinear)?;
/// let rotated = rotate.apply(volume, &mut rng)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Rotate {
    angle_degrees: f64,
    axes: (usize, usize),
    interpolation: Interpolation,
}

impl Rotate {
    pub fn new(
        angle_degrees: f64,
        axes: (usize, usize),
        interpolation: Interpolation,
    ) -> Result<Self> {
        ensure!(
            angle_degrees.is_finite(),
            VolumeError::InvalidConfig(format!(
                "Rotation angle must be finite (got {})",
                angle_degrees
            ))
        );
        check_axes(axes)?;
        Ok(Self {
            angle_degrees,
            axes,
            interpolation,
        })
    }
}

impl Transform<Volume, Volume> for Rotate {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        rotate(&input, self.axes, self.angle_degrees, self.interpolation)
    }

    fn geometry(&self) -> Option<String> {
        Some(format!(
            "Rotate(angle={:?}, axes={:?})",
            self.angle_degrees, self.axes
        ))
    }
}

// ============================================================================
// RandRotate
// ============================================================================

/// With probability `prob`, rotates by an angle drawn uniformly from
/// `range_degrees`.
///
/// The coin and the angle are always drawn, so an image step and a label step
/// at the same pipeline position consume their streams identically even when
/// their probabilities differ.
#[derive(Debug, Clone, Copy)]
pub struct RandRotate {
    range_degrees: (f64, f64),
    axes: (usize, usize),
    prob: f64,
    interpolation: Interpolation,
}

impl RandRotate {
    pub fn new(
        range_degrees: (f64, f64),
        axes: (usize, usize),
        prob: f64,
        interpolation: Interpolation,
    ) -> Result<Self> {
        let (lo, hi) = range_degrees;
        ensure!(
            lo.is_finite() && hi.is_finite() && lo <= hi,
            VolumeError::InvalidConfig(format!(
                "Rotation range must be finite with lo <= hi (got {:?})",
                range_degrees
            ))
        );
        ensure!(
            (0.0..=1.0).contains(&prob),
            VolumeError::InvalidConfig(format!(
                "Probability must be in [0.0, 1.0] range (got {})",
                prob
            ))
        );
        check_axes(axes)?;
        Ok(Self {
            range_degrees,
            axes,
            prob,
            interpolation,
        })
    }
}

impl Transform<Volume, Volume> for RandRotate {
    fn apply(&self, input: Volume, rng: &mut SampleRng) -> Result<Volume> {
        let coin = rng.gen_unit();
        let angle = rng.gen_range_f64(self.range_degrees.0, self.range_degrees.1);
        if coin >= self.prob {
            return Ok(input);
        }
        rotate(&input, self.axes, angle, self.interpolation)
    }

    fn geometry(&self) -> Option<String> {
        Some(format!(
            "RandRotate(range={:?}, axes={:?}, prob={:?})",
            self.range_degrees, self.axes, self.prob
        ))
    }
}
