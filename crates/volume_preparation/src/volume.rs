use crate::error::VolumeError;
use anyhow::Result;
use ndarray::{ArrayD, ArrayView4, Axis, Ix4, IxDyn};

/// A dense volumetric scan or label mask.
///
/// A `Volume` is either rank 3 (`[X, Y, Z]`, no channel axis) or rank 4
/// (`[C, X, Y, Z]`, channel first). The last three axes are always spatial.
///
/// Volumes are values: transforms consume a volume and return a new one, so
/// nothing downstream can observe a half-transformed array.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: ArrayD<f32>,
}

impl Volume {
    /// Wraps an array, checking the rank and that no axis is empty.
    pub fn new(data: ArrayD<f32>) -> Result<Self> {
        let ndim = data.ndim();
        if ndim != 3 && ndim != 4 {
            return Err(VolumeError::Shape(format!(
                "Volume must have rank 3 [X, Y, Z] or 4 [C, X, Y, Z] (got shape {:?})",
                data.shape()
            ))
            .into());
        }
        if data.shape().iter().any(|&d| d == 0) {
            return Err(VolumeError::Shape(format!(
                "Volume dimensions must be positive (got shape {:?})",
                data.shape()
            ))
            .into());
        }
        Ok(Self { data })
    }

    pub fn zeros(shape: &[usize]) -> Result<Self> {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn from_shape_vec(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        let data = ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| {
            VolumeError::Shape(format!(
                "Cannot build volume of shape {:?}: {}",
                shape, e
            ))
        })?;
        Self::new(data)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn has_channel(&self) -> bool {
        self.data.ndim() == 4
    }

    /// Number of channels; 1 for a volume without a channel axis.
    pub fn channels(&self) -> usize {
        if self.has_channel() {
            self.data.shape()[0]
        } else {
            1
        }
    }

    pub fn spatial_shape(&self) -> [usize; 3] {
        let s = self.data.shape();
        let o = s.len() - 3;
        [s[o], s[o + 1], s[o + 2]]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }

    /// Channel-first 4-D view, inserting a unit channel for rank-3 volumes.
    pub fn channels_view(&self) -> ArrayView4<'_, f32> {
        let view = if self.has_channel() {
            self.data.view()
        } else {
            self.data.view().insert_axis(Axis(0))
        };
        view.into_dimensionality::<Ix4>()
            .expect("Volume rank is validated on construction")
    }

    /// Rebuilds a volume with the same channel layout as `self` from
    /// channel-first data of shape `[C, X, Y, Z]`.
    pub(crate) fn with_layout_of(&self, channels_first: ArrayD<f32>) -> Result<Self> {
        let data = if self.has_channel() {
            channels_first
        } else {
            channels_first.index_axis_move(Axis(0), 0)
        };
        Self::new(data)
    }

    /// Smallest and largest voxel values.
    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Spatial position of the largest voxel (first occurrence, any channel).
    pub fn argmax(&self) -> [usize; 3] {
        let mut best = f32::NEG_INFINITY;
        let mut best_pos = [0usize; 3];
        for ((_, x, y, z), &v) in self.channels_view().indexed_iter() {
            if v > best {
                best = v;
                best_pos = [x, y, z];
            }
        }
        best_pos
    }

    /// Spatial positions of all voxels that are non-zero in any channel.
    pub fn nonzero_positions(&self) -> Vec<[usize; 3]> {
        let [sx, sy, sz] = self.spatial_shape();
        let view = self.channels_view();
        let mut out = Vec::new();
        for x in 0..sx {
            for y in 0..sy {
                for z in 0..sz {
                    if (0..view.shape()[0]).any(|c| view[[c, x, y, z]] != 0.0) {
                        out.push([x, y, z]);
                    }
                }
            }
        }
        out
    }
}

impl TryFrom<ArrayD<f32>> for Volume {
    type Error = anyhow::Error;

    fn try_from(data: ArrayD<f32>) -> Result<Self> {
        Self::new(data)
    }
}
