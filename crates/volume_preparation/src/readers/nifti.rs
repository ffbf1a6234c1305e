use super::VolumeReader;
use crate::error::VolumeError;
use crate::volume::Volume;
use anyhow::Result;
use log::debug;
use ndarray::{ArrayD, IxDyn};
use ::nifti::volume::ndarray::IntoNdArray;
use ::nifti::volume::NiftiVolume;
use ::nifti::{NiftiObject, NiftiType, ReaderOptions};
use std::path::Path;

/// Reads `.nii` and `.nii.gz` files into [`Volume`]s.
///
/// - 3-D files `(x, y, z)` become rank-3 volumes `[X, Y, Z]`.
/// - 4-D files `(x, y, z, t)` become channel-first volumes `[T, X, Y, Z]`.
///
/// Voxels are read as `f32` with the header's slope/intercept applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiReader;

fn decode_error(path: &Path, reason: impl Into<String>) -> VolumeError {
    VolumeError::Decode {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

impl VolumeReader for NiftiReader {
    fn read(&self, path: &Path) -> Result<Volume> {
        if !path.is_file() {
            return Err(VolumeError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let object = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| decode_error(path, e.to_string()))?;
        let header_volume = object.volume();

        if !matches!(header_volume.data_type(), NiftiType::Float32) {
            debug!(
                "{}: converting {:?} voxels to f32",
                path.display(),
                header_volume.data_type()
            );
        }
        let rank = header_volume.dim().len();
        if rank != 3 && rank != 4 {
            return Err(decode_error(
                path,
                format!(
                    "expected a 3-D or 4-D volume, got dimensions {:?}",
                    header_volume.dim()
                ),
            )
            .into());
        }

        // One conversion for the whole buffer; slope and intercept applied here
        let decoded = object
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| decode_error(path, e.to_string()))?;
        let shape = decoded.shape().to_vec();
        // Logical order, whatever the memory layout of `decoded`
        let values: Vec<f32> = decoded.iter().copied().collect();

        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| decode_error(path, e.to_string()))?;
        let data = if rank == 4 {
            // (x, y, z, t) -> (t, x, y, z)
            data.permuted_axes(IxDyn(&[3, 0, 1, 2]))
                .as_standard_layout()
                .into_owned()
        } else {
            data
        };
        Volume::new(data).map_err(|e| decode_error(path, e.to_string()).into())
    }
}
