//! Geometric transforms.
//!
//! ```text
//! transforms/spatial/
//! ├── affine.rs       → Affine3 map on centred voxel coordinates
//! ├── resample.rs     → Pull-back resampling (nearest / trilinear)
//! ├── rotate.rs       → Rotate, RandRotate
//! ├── flip.rs         → Flip, RandFlip
//! ├── crop.rs         → RandomPatch, CenterCrop
//! └── rand_affine.rs  → RandAffine
//! ```
//!
//! Every transform here reports its `geometry()` (so `is_spatial()` holds)
//! and draws its random parameters in a fixed order, so the same step in an
//! image pipeline and a label pipeline moves voxels identically.

pub mod affine;
pub mod crop;
pub mod flip;
pub mod rand_affine;
pub mod resample;
pub mod rotate;

pub use affine::Affine3;
pub use crop::{CenterCrop, RandomPatch};
pub use flip::{Flip, RandFlip};
pub use rand_affine::{RandAffine, RandAffineBuilder};
pub use resample::resample;
pub use rotate::{RandRotate, Rotate};

use serde::{Deserialize, Serialize};

/// How voxel values are read at non-integer positions.
///
/// Use `Nearest` for label masks (keeps class values intact) and `Trilinear`
/// for intensities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Trilinear,
}
