#![allow(dead_code)]

use anyhow::Result;
use std::path::Path;
use volume_preparation::{
    dataset::Dataset, transforms::Compose, InMemoryPairSource, PairedDataset, PairedPipelines,
    Sample, Volume,
};

/// A `[nx, ny, nz]` volume whose voxel `(x, y, z)` holds `offset + x*100 + y*10 + z`.
pub fn coded_volume(dims: [usize; 3], offset: f32) -> Volume {
    let [nx, ny, nz] = dims;
    let mut values = Vec::with_capacity(nx * ny * nz);
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                values.push(offset + (x * 100 + y * 10 + z) as f32);
            }
        }
    }
    Volume::from_shape_vec(&dims, values).unwrap()
}

/// A binary mask marking voxels with `x + y + z` even.
pub fn checker_mask(dims: [usize; 3]) -> Volume {
    let [nx, ny, nz] = dims;
    let mut values = Vec::with_capacity(nx * ny * nz);
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                values.push(((x + y + z) % 2 == 0) as u8 as f32);
            }
        }
    }
    Volume::from_shape_vec(&dims, values).unwrap()
}

/// `n` image/mask pairs of the same shape, each image offset by `1000 * i`.
pub fn synthetic_pairs(n: usize, dims: [usize; 3]) -> Vec<(Volume, Volume)> {
    (0..n)
        .map(|i| (coded_volume(dims, 1000.0 * i as f32), checker_mask(dims)))
        .collect()
}

pub fn identity_pipelines() -> PairedPipelines {
    PairedPipelines::new(Compose::new(), Compose::new()).unwrap()
}

pub fn in_memory_dataset(
    n: usize,
    dims: [usize; 3],
    pipelines: PairedPipelines,
) -> PairedDataset<InMemoryPairSource> {
    PairedDataset::new(InMemoryPairSource::new(synthetic_pairs(n, dims)), pipelines)
}

/// Wraps a dataset and panics when a chosen index is requested.
pub struct PanicAt<D> {
    pub inner: D,
    pub index: usize,
}

impl<D: Dataset> Dataset for PanicAt<D> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get_sample(&self, index: usize, seed: u64) -> Result<Sample> {
        if index == self.index {
            panic!("injected failure at index {}", index);
        }
        self.inner.get_sample(index, seed)
    }
}

/// Wraps a dataset and sleeps before returning chosen indices.
pub struct SlowAt<D> {
    pub inner: D,
    pub indices: Vec<usize>,
    pub delay: std::time::Duration,
}

impl<D: Dataset> Dataset for SlowAt<D> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get_sample(&self, index: usize, seed: u64) -> Result<Sample> {
        if self.indices.contains(&index) {
            std::thread::sleep(self.delay);
        }
        self.inner.get_sample(index, seed)
    }
}

/// Writes an uncompressed little-endian NIfTI-1 file with float32 voxels.
///
/// `dims` holds 3 or 4 extents; `values` is in file order (x fastest).
pub fn write_nifti(path: &Path, dims: &[usize], values: &[f32]) -> Result<()> {
    write_scaled_nifti(path, dims, values, 1.0, 0.0)
}

/// Like [`write_nifti`], with the header's `scl_slope` and `scl_inter` set.
pub fn write_scaled_nifti(
    path: &Path,
    dims: &[usize],
    values: &[f32],
    slope: f32,
    intercept: f32,
) -> Result<()> {
    assert!(dims.len() == 3 || dims.len() == 4);
    assert_eq!(dims.iter().product::<usize>(), values.len());

    let mut header = vec![0u8; 348];
    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    let mut dim = [1i16; 8];
    dim[0] = dims.len() as i16;
    for (i, &d) in dims.iter().enumerate() {
        dim[i + 1] = d as i16;
    }
    for (i, d) in dim.iter().enumerate() {
        header[40 + 2 * i..42 + 2 * i].copy_from_slice(&d.to_le_bytes());
    }

    header[70..72].copy_from_slice(&16i16.to_le_bytes()); // float32
    header[72..74].copy_from_slice(&32i16.to_le_bytes());
    for i in 0..8 {
        header[76 + 4 * i..80 + 4 * i].copy_from_slice(&1.0f32.to_le_bytes());
    }
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());
    header[112..116].copy_from_slice(&slope.to_le_bytes());
    header[116..120].copy_from_slice(&intercept.to_le_bytes());
    header[344..348].copy_from_slice(b"n+1\0");

    let mut bytes = header;
    bytes.extend_from_slice(&[0u8; 4]);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Writes `volume` (`[X, Y, Z]`) as a NIfTI file.
pub fn write_volume(path: &Path, volume: &Volume) -> Result<()> {
    let [nx, ny, nz] = volume.spatial_shape();
    let data = volume.data();
    let mut values = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                values.push(data[[x, y, z]]);
            }
        }
    }
    write_nifti(path, &[nx, ny, nz], &values)
}

/// Writes `n` pairs named `im{i}.nii` / `seg{i}.nii` into `dir`.
pub fn write_pair_files(dir: &Path, n: usize, dims: [usize; 3]) -> Result<()> {
    for (i, (image, label)) in synthetic_pairs(n, dims).iter().enumerate() {
        write_volume(&dir.join(format!("im{}.nii", i)), image)?;
        write_volume(&dir.join(format!("seg{}.nii", i)), label)?;
    }
    Ok(())
}
