use super::{Affine3, Interpolation};
use crate::error::VolumeError;
use crate::volume::Volume;
use anyhow::{ensure, Result};
use ndarray::{ArrayD, ArrayView4, IxDyn};
use rayon::prelude::*;

/// Resamples `volume` onto a grid of `out_shape` spatial voxels.
///
/// For every output voxel `o`, the centred position `o - (n_out - 1) / 2` is
/// mapped through `inverse` into centred input coordinates, shifted by the
/// input centre `(n_in - 1) / 2`, and interpolated per channel. Positions
/// outside the input read as zero.
///
/// Slices along the first spatial axis are filled in parallel.
pub fn resample(
    volume: &Volume,
    inverse: &Affine3,
    out_shape: [usize; 3],
    interpolation: Interpolation,
) -> Result<Volume> {
    ensure!(
        out_shape.iter().all(|&n| n > 0),
        VolumeError::Shape(format!(
            "Resampled spatial shape must be positive (got {:?})",
            out_shape
        ))
    );

    let input = volume.channels_view();
    let channels = input.shape()[0];
    let in_shape = volume.spatial_shape();
    let in_centre = in_shape.map(|n| (n as f64 - 1.0) / 2.0);
    let out_centre = out_shape.map(|n| (n as f64 - 1.0) / 2.0);
    let [ox, oy, oz] = out_shape;

    let mut out = vec![0f32; channels * ox * oy * oz];
    out.par_chunks_mut(oy * oz)
        .enumerate()
        .for_each(|(slice, plane)| {
            let c = slice / ox;
            let x = slice % ox;
            for y in 0..oy {
                for z in 0..oz {
                    let centred = [
                        x as f64 - out_centre[0],
                        y as f64 - out_centre[1],
                        z as f64 - out_centre[2],
                    ];
                    let mapped = inverse.apply_point(centred);
                    let pos = [
                        mapped[0] + in_centre[0],
                        mapped[1] + in_centre[1],
                        mapped[2] + in_centre[2],
                    ];
                    plane[y * oz + z] = match interpolation {
                        Interpolation::Nearest => nearest(&input, c, pos),
                        Interpolation::Trilinear => trilinear(&input, c, pos),
                    };
                }
            }
        });

    let data = ArrayD::from_shape_vec(IxDyn(&[channels, ox, oy, oz]), out)
        .map_err(|e| VolumeError::Shape(format!("Resampled buffer mismatch: {}", e)))?;
    volume.with_layout_of(data)
}

#[inline]
fn voxel(input: &ArrayView4<'_, f32>, c: usize, idx: [i64; 3]) -> f32 {
    let shape = input.shape();
    let inside = idx
        .iter()
        .zip(&shape[1..])
        .all(|(&i, &n)| i >= 0 && (i as usize) < n);
    if inside {
        input[[c, idx[0] as usize, idx[1] as usize, idx[2] as usize]]
    } else {
        0.0
    }
}

fn nearest(input: &ArrayView4<'_, f32>, c: usize, pos: [f64; 3]) -> f32 {
    voxel(input, c, pos.map(|p| p.round() as i64))
}

fn trilinear(input: &ArrayView4<'_, f32>, c: usize, pos: [f64; 3]) -> f32 {
    let base = pos.map(|p| p.floor());
    let frac = [pos[0] - base[0], pos[1] - base[1], pos[2] - base[2]];
    let base = base.map(|b| b as i64);

    let mut acc = 0f64;
    for corner in 0..8 {
        let step = [(corner >> 2) & 1, (corner >> 1) & 1, corner & 1];
        let mut weight = 1f64;
        for axis in 0..3 {
            weight *= if step[axis] == 1 {
                frac[axis]
            } else {
                1.0 - frac[axis]
            };
        }
        if weight == 0.0 {
            continue;
        }
        let idx = [
            base[0] + step[0] as i64,
            base[1] + step[1] as i64,
            base[2] + step[2] as i64,
        ];
        acc += weight * voxel(input, c, idx) as f64;
    }
    acc as f32
}
