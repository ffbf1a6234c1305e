use super::{resample, Affine3, Interpolation};
use crate::error::VolumeError;
use crate::transforms::{SampleRng, Transform};
use crate::volume::Volume;
use anyhow::{ensure, Result};

/// Random rotation, scaling and translation resampled in one pass.
///
/// Per sample, with probability `prob`:
/// - rotation about each spatial axis in `[-rotate_range[i], rotate_range[i]]`
///   radians
/// - scale factor `1 + u`, `u` in `[-scale_range[i], scale_range[i]]`
/// - translation in `[-translate_range[i], translate_range[i]]` voxels
///
/// The forward map is `translate * rotate_z * rotate_y * rotate_x * scale`
/// about the volume centre. The output has `spatial_size` voxels, or the
/// input spatial shape when unset; voxels mapped from outside are zero.
///
/// All parameters are drawn on every call in a fixed order, so two
/// `RandAffine` steps at the same pipeline position sample the same
/// geometry even when their interpolation differs.
///
/// # Example
/// ```ignore
/// let affine = RandAffine::builder()
///     .prob(1.0)
///     .rotate_range([0.0, 0.0, std::f64::consts::FRAC_PI_4])
///     .scale_range([0.1; 3])
///     .spatial_size([96, 96, 96])
///     .interpolation(Interpolation::Nearest)
///     .build()?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RandAffine {
    prob: f64,
    rotate_range: [f64; 3],
    translate_range: [f64; 3],
    scale_range: [f64; 3],
    spatial_size: Option<[usize; 3]>,
    interpolation: Interpolation,
}

impl RandAffine {
    pub fn builder() -> RandAffineBuilder {
        RandAffineBuilder::default()
    }

    /// Forward map for one draw of the random parameters.
    fn sample_affine(&self, rng: &mut SampleRng) -> Affine3 {
        let mut symmetric = |range: f64| rng.gen_range_f64(-range, range);
        let angles = self.rotate_range.map(&mut symmetric);
        let scales = self.scale_range.map(|r| 1.0 + symmetric(r));
        let shifts = self.translate_range.map(&mut symmetric);

        Affine3::translation(shifts)
            .compose(&Affine3::rotation_about(2, angles[2]))
            .compose(&Affine3::rotation_about(1, angles[1]))
            .compose(&Affine3::rotation_about(0, angles[0]))
            .compose(&Affine3::scaling(scales))
    }
}

impl Transform<Volume, Volume> for RandAffine {
    fn apply(&self, input: Volume, rng: &mut SampleRng) -> Result<Volume> {
        let coin = rng.gen_unit();
        let forward = self.sample_affine(rng);
        let out_shape = self.spatial_size.unwrap_or_else(|| input.spatial_shape());

        if coin >= self.prob {
            if out_shape == input.spatial_shape() {
                return Ok(input);
            }
            // Not applied, but the output size still has to match
            return resample(&input, &Affine3::identity(), out_shape, self.interpolation);
        }

        let inverse = forward.inverse().ok_or_else(|| {
            VolumeError::InvalidValue(format!("Sampled affine is singular: {:?}", forward))
        })?;
        resample(&input, &inverse, out_shape, self.interpolation)
    }

    fn geometry(&self) -> Option<String> {
        Some(format!(
            "RandAffine(prob={:?}, rotate={:?}, translate={:?}, scale={:?}, size={:?})",
            self.prob, self.rotate_range, self.translate_range, self.scale_range, self.spatial_size
        ))
    }
}

/// Builder for [`RandAffine`]. Every range defaults to zero, `prob` to 0.1
/// and interpolation to trilinear.
#[derive(Debug, Clone)]
pub struct RandAffineBuilder {
    prob: f64,
    rotate_range: [f64; 3],
    translate_range: [f64; 3],
    scale_range: [f64; 3],
    spatial_size: Option<[usize; 3]>,
    interpolation: Interpolation,
}

impl Default for RandAffineBuilder {
    fn default() -> Self {
        Self {
            prob: 0.1,
            rotate_range: [0.0; 3],
            translate_range: [0.0; 3],
            scale_range: [0.0; 3],
            spatial_size: None,
            interpolation: Interpolation::Trilinear,
        }
    }
}

impl RandAffineBuilder {
    pub fn prob(mut self, prob: f64) -> Self {
        self.prob = prob;
        self
    }

    /// Radians per spatial axis.
    pub fn rotate_range(mut self, range: [f64; 3]) -> Self {
        self.rotate_range = range;
        self
    }

    /// Voxels per spatial axis.
    pub fn translate_range(mut self, range: [f64; 3]) -> Self {
        self.translate_range = range;
        self
    }

    /// Fraction of unit scale per spatial axis; must stay below 1.
    pub fn scale_range(mut self, range: [f64; 3]) -> Self {
        self.scale_range = range;
        self
    }

    pub fn spatial_size(mut self, size: [usize; 3]) -> Self {
        self.spatial_size = Some(size);
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn build(self) -> Result<RandAffine> {
        ensure!(
            (0.0..=1.0).contains(&self.prob),
            VolumeError::InvalidConfig(format!(
                "Probability must be in [0.0, 1.0] range (got {})",
                self.prob
            ))
        );
        let ranges = self
            .rotate_range
            .iter()
            .chain(&self.translate_range)
            .chain(&self.scale_range);
        for r in ranges {
            ensure!(
                r.is_finite() && *r >= 0.0,
                VolumeError::InvalidConfig(format!(
                    "Affine ranges must be finite and non-negative (got {})",
                    r
                ))
            );
        }
        ensure!(
            self.scale_range.iter().all(|&r| r < 1.0),
            VolumeError::InvalidConfig(format!(
                "Scale range must be below 1 so scale factors stay positive (got {:?})",
                self.scale_range
            ))
        );
        if let Some(size) = self.spatial_size {
            ensure!(
                size.iter().all(|&n| n > 0),
                VolumeError::InvalidConfig(format!(
                    "Spatial size must be positive (got {:?})",
                    size
                ))
            );
        }

        Ok(RandAffine {
            prob: self.prob,
            rotate_range: self.rotate_range,
            translate_range: self.translate_range,
            scale_range: self.scale_range,
            spatial_size: self.spatial_size,
            interpolation: self.interpolation,
        })
    }
}
