use crate::error::VolumeError;
use crate::transforms::{SampleRng, Transform};
use crate::volume::Volume;
use anyhow::{ensure, Result};
use ndarray::Axis;

fn check_axis(axis: usize) -> Result<()> {
    ensure!(
        axis < 3,
        VolumeError::InvalidConfig(format!(
            "Flip axis must be a spatial axis in 0..3 (got {})",
            axis
        ))
    );
    Ok(())
}

fn flip(input: Volume, axis: usize) -> Result<Volume> {
    let offset = input.ndim() - 3;
    let mut data = input.into_array();
    data.invert_axis(Axis(offset + axis));
    Volume::new(data.as_standard_layout().into_owned())
}

/// Mirrors the volume along one spatial axis.
#[derive(Debug, Clone, Copy)]
pub struct Flip {
    axis: usize,
}

impl Flip {
    pub fn new(axis: usize) -> Result<Self> {
        check_axis(axis)?;
        Ok(Self { axis })
    }
}

impl Transform<Volume, Volume> for Flip {
    fn apply(&self, input: Volume, _: &mut SampleRng) -> Result<Volume> {
        flip(input, self.axis)
    }

    fn geometry(&self) -> Option<String> {
        Some(format!("Flip(axis={})", self.axis))
    }
}

/// Mirrors along `axis` with probability `prob`.
#[derive(Debug, Clone, Copy)]
pub struct RandFlip {
    axis: usize,
    prob: f64,
}

impl RandFlip {
    pub fn new(axis: usize, prob: f64) -> Result<Self> {
        check_axis(axis)?;
        ensure!(
            (0.0..=1.0).contains(&prob),
            VolumeError::InvalidConfig(format!(
                "Probability must be in [0.0, 1.0] range (got {})",
                prob
            ))
        );
        Ok(Self { axis, prob })
    }
}

impl Transform<Volume, Volume> for RandFlip {
    fn apply(&self, input: Volume, rng: &mut SampleRng) -> Result<Volume> {
        if rng.gen_unit() < self.prob {
            flip(input, self.axis)
        } else {
            Ok(input)
        }
    }

    fn geometry(&self) -> Option<String> {
        Some(format!("RandFlip(axis={}, prob={:?})", self.axis, self.prob))
    }
}
