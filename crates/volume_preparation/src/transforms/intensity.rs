//! Voxel-value transforms. None of these move voxels, so they may differ
//! freely between an image pipeline and its label pipeline.

use crate::error::VolumeError;
use crate::transforms::{SampleRng, Transform};
use crate::volume::Volume;
use anyhow::{ensure, Result};
use ndarray::Axis;

// ============================================================================
// Identity
// ============================================================================

/// Returns its input untouched. Used to pad a pipeline so spatial steps line
/// up with the paired pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform<Volume, Volume> for Identity {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        Ok(input)
    }
}

// ============================================================================
// AddChannel
// ============================================================================

/// Adds a leading unit channel axis: `[X, Y, Z]` becomes `[1, X, Y, Z]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddChannel;

impl Transform<Volume, Volume> for AddChannel {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        if input.has_channel() {
            return Err(VolumeError::Shape(format!(
                "AddChannel expects a volume without channel axis (got shape {:?})",
                input.shape()
            ))
            .into());
        }
        Volume::new(input.into_array().insert_axis(Axis(0)))
    }
}

// ============================================================================
// ScaleIntensity
// ============================================================================

/// Min-max rescales every voxel into `[min, max]`.
///
/// # Mathematical Operation:
/// ```text
/// output = (input - lo) / (hi - lo) * (max - min) + min
/// ```
/// where `lo`/`hi` are the smallest and largest input voxels. A constant
/// input (`lo == hi`) maps every voxel to `min`.
///
/// # Example
/// ```ignore
/// let scale = ScaleIntensity::default(); // [0, 1]
/// let scaled = scale.apply(volume, &mut rng)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ScaleIntensity {
    min: f32,
    max: f32,
}

impl ScaleIntensity {
    pub fn new(min: f32, max: f32) -> Result<Self> {
        ensure!(
            min.is_finite() && max.is_finite() && min <= max,
            VolumeError::InvalidConfig(format!(
                "ScaleIntensity needs finite bounds with min <= max (got [{}, {}])",
                min, max
            ))
        );
        Ok(Self { min, max })
    }
}

impl Default for ScaleIntensity {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl Transform<Volume, Volume> for ScaleIntensity {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        ensure!(
            input.data().iter().all(|v| v.is_finite()),
            VolumeError::InvalidValue(format!(
                "ScaleIntensity input contains non-finite voxels (shape {:?})",
                input.shape()
            ))
        );

        let (lo, hi) = input.min_max();
        let (min, max) = (self.min, self.max);
        let mut data = input.into_array();

        if hi == lo {
            data.fill(min);
        } else {
            // f64 throughout: `hi - lo` may exceed f32::MAX
            let (lo, min) = (lo as f64, min as f64);
            let factor = (max as f64 - min) / (hi as f64 - lo);
            data.mapv_inplace(|v| {
                let scaled = min + (v as f64 - lo) * factor;
                (scaled as f32).clamp(self.min, self.max)
            });
        }
        Volume::new(data)
    }
}

// ============================================================================
// NormalizeIntensity
// ============================================================================

/// Shifts to zero mean and scales to unit standard deviation.
///
/// With `nonzero` set, statistics come from the nonzero voxels only and zero
/// voxels (typically background) are left at zero. A zero standard deviation
/// leaves the values centred but unscaled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeIntensity {
    nonzero: bool,
}

impl NormalizeIntensity {
    pub fn new(nonzero: bool) -> Self {
        Self { nonzero }
    }
}

impl Transform<Volume, Volume> for NormalizeIntensity {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        let selected = |v: f32| !self.nonzero || v != 0.0;

        let (mut count, mut sum, mut sum_sq) = (0usize, 0f64, 0f64);
        for &v in input.data().iter().filter(|&&v| selected(v)) {
            count += 1;
            sum += v as f64;
            sum_sq += (v as f64) * (v as f64);
        }
        if count == 0 {
            return Ok(input);
        }

        let mean = sum / count as f64;
        let var = (sum_sq / count as f64 - mean * mean).max(0.0);
        let std = var.sqrt();

        let mut data = input.into_array();
        data.mapv_inplace(|v| {
            if !selected(v) {
                return v;
            }
            let centred = v as f64 - mean;
            if std > 0.0 {
                (centred / std) as f32
            } else {
                centred as f32
            }
        });
        Volume::new(data)
    }
}

// ============================================================================
// ThresholdIntensity
// ============================================================================

/// Keeps voxels on one side of a threshold and replaces the rest with `cval`.
///
/// With `above = true` values strictly greater than `threshold` are kept;
/// otherwise values strictly less than it are kept.
///
/// # Example
/// ```ignore
/// // Binarize a label: everything <= 0.5 becomes 0
/// let binarize = ThresholdIntensity::new(0.5, true, 0.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ThresholdIntensity {
    threshold: f32,
    above: bool,
    cval: f32,
}

impl ThresholdIntensity {
    pub fn new(threshold: f32, above: bool, cval: f32) -> Self {
        Self {
            threshold,
            above,
            cval,
        }
    }
}

impl Transform<Volume, Volume> for ThresholdIntensity {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        let mut data = input.into_array();
        data.mapv_inplace(|v| {
            let keep = if self.above {
                v > self.threshold
            } else {
                v < self.threshold
            };
            if keep {
                v
            } else {
                self.cval
            }
        });
        Volume::new(data)
    }
}

// ============================================================================
// RandShiftIntensity
// ============================================================================

/// With probability `prob`, adds one offset drawn uniformly from
/// `[-offsets, offsets]` to every voxel.
#[derive(Debug, Clone, Copy)]
pub struct RandShiftIntensity {
    offsets: f32,
    prob: f64,
}

impl RandShiftIntensity {
    pub fn new(offsets: f32, prob: f64) -> Result<Self> {
        ensure!(
            offsets.is_finite() && offsets >= 0.0,
            VolumeError::InvalidConfig(format!(
                "Shift offsets must be finite and non-negative (got {})",
                offsets
            ))
        );
        ensure!(
            (0.0..=1.0).contains(&prob),
            VolumeError::InvalidConfig(format!(
                "Probability must be in [0.0, 1.0] range (got {})",
                prob
            ))
        );
        Ok(Self { offsets, prob })
    }
}

impl Transform<Volume, Volume> for RandShiftIntensity {
    fn apply(&self, input: Volume, rng: &mut SampleRng) -> Result<Volume> {
        if !rng.gen_bool(self.prob) {
            return Ok(input);
        }
        let offset = rng.gen_range_f64(-self.offsets as f64, self.offsets as f64) as f32;
        let mut data = input.into_array();
        data.mapv_inplace(|v| v + offset);
        Volume::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(values: &[f32]) -> Volume {
        Volume::from_shape_vec(&[values.len(), 1, 1], values.to_vec()).unwrap()
    }

    #[test]
    fn test_add_channel() -> Result<()> {
        let mut rng = SampleRng::new(0);
        let out = AddChannel.apply(Volume::zeros(&[2, 3, 4])?, &mut rng)?;
        assert_eq!(out.shape(), &[1, 2, 3, 4]);

        let err = AddChannel.apply(out, &mut rng).unwrap_err();
        assert!(matches!(
            VolumeError::kind_of(&err),
            Some(VolumeError::Shape(_))
        ));
        Ok(())
    }

    #[test]
    fn test_scale_intensity_range() -> Result<()> {
        let input = volume(&[-3.0, 0.5, 7.0, 2.0]);
        let out = ScaleIntensity::default().apply(input, &mut SampleRng::new(0))?;
        assert_eq!(out.min_max(), (0.0, 1.0));
        assert!(out.data().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((out.data()[[1, 0, 0]] - 0.35).abs() < 1e-6);

        let out = ScaleIntensity::new(-1.0, 1.0)?.apply(out, &mut SampleRng::new(0))?;
        assert_eq!(out.min_max(), (-1.0, 1.0));
        Ok(())
    }

    #[test]
    fn test_scale_intensity_constant_maps_to_min() -> Result<()> {
        let out = ScaleIntensity::default().apply(volume(&[4.0; 5]), &mut SampleRng::new(0))?;
        assert!(out.data().iter().all(|&v| v == 0.0));

        let out = ScaleIntensity::new(2.0, 3.0)?.apply(volume(&[-1.0; 3]), &mut SampleRng::new(0))?;
        assert!(out.data().iter().all(|&v| v == 2.0));
        Ok(())
    }

    #[test]
    fn test_scale_intensity_range_wider_than_f32() -> Result<()> {
        let input = volume(&[-3.0e38, 0.0, 3.0e38]);
        let out = ScaleIntensity::default().apply(input, &mut SampleRng::new(0))?;
        let values: Vec<f32> = out.data().iter().copied().collect();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)), "{:?}", values);
        assert_eq!(values[0], 0.0);
        assert!((values[1] - 0.5).abs() < 1e-6);
        assert_eq!(values[2], 1.0);
        Ok(())
    }

    #[test]
    fn test_scale_intensity_rejects_non_finite() {
        let err = ScaleIntensity::default()
            .apply(volume(&[0.0, f32::NAN, 1.0]), &mut SampleRng::new(0))
            .unwrap_err();
        assert!(matches!(
            VolumeError::kind_of(&err),
            Some(VolumeError::InvalidValue(_))
        ));
        assert!(ScaleIntensity::new(1.0, 0.0).is_err());
    }

    #[test]
    fn test_normalize_intensity() -> Result<()> {
        let out = NormalizeIntensity::new(false)
            .apply(volume(&[1.0, 2.0, 3.0, 4.0]), &mut SampleRng::new(0))?;
        let mean: f32 = out.data().iter().sum::<f32>() / 4.0;
        let var: f32 = out.data().iter().map(|v| v * v).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-5);
        assert!((var - 1.0).abs() < 1e-5);

        // Background stays zero
        let out = NormalizeIntensity::new(true)
            .apply(volume(&[0.0, 2.0, 4.0, 0.0]), &mut SampleRng::new(0))?;
        let values: Vec<f32> = out.data().iter().copied().collect();
        assert_eq!(values, vec![0.0, -1.0, 1.0, 0.0]);

        // Zero std: centred only
        let out = NormalizeIntensity::new(false).apply(volume(&[5.0; 3]), &mut SampleRng::new(0))?;
        assert!(out.data().iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_threshold_intensity() -> Result<()> {
        let input = volume(&[0.2, 0.5, 0.9, 3.0]);
        let out =
            ThresholdIntensity::new(0.5, true, 0.0).apply(input.clone(), &mut SampleRng::new(0))?;
        let values: Vec<f32> = out.data().iter().copied().collect();
        assert_eq!(values, vec![0.0, 0.0, 0.9, 3.0]);

        let out = ThresholdIntensity::new(0.5, false, -1.0).apply(input, &mut SampleRng::new(0))?;
        let values: Vec<f32> = out.data().iter().copied().collect();
        assert_eq!(values, vec![0.2, -1.0, -1.0, -1.0]);
        Ok(())
    }

    #[test]
    fn test_rand_shift_intensity() -> Result<()> {
        let input = volume(&[1.0, 2.0, 3.0]);

        let never = RandShiftIntensity::new(10.0, 0.0)?;
        assert_eq!(never.apply(input.clone(), &mut SampleRng::new(3))?, input);

        let always = RandShiftIntensity::new(0.5, 1.0)?;
        let a = always.apply(input.clone(), &mut SampleRng::new(3))?;
        let b = always.apply(input.clone(), &mut SampleRng::new(3))?;
        assert_eq!(a, b);

        let shift = a.data()[[0, 0, 0]] - 1.0;
        assert!(shift.abs() <= 0.5);
        for (out, orig) in a.data().iter().zip(input.data().iter()) {
            assert!((out - orig - shift).abs() < 1e-6);
        }

        assert!(RandShiftIntensity::new(-1.0, 0.5).is_err());
        assert!(RandShiftIntensity::new(1.0, 1.5).is_err());
        Ok(())
    }
}
