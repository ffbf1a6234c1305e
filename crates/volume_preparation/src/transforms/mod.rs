//! Volume transforms.
//!
//! ```text
//! transforms/
//! ├── core.rs         → Transform trait and Chain
//! ├── rng.rs          → SampleRng and per-sample seeds
//! ├── compose.rs      → Compose, PairedPipelines
//! ├── intensity.rs    → Value transforms (rescale, normalize, threshold, shift)
//! ├── spatial/        → Geometric transforms (rotate, flip, crop, affine)
//! └── conversion.rs   → Volume → Sample
//! ```

pub mod compose;
pub mod conversion;
pub mod core;
pub mod intensity;
pub mod rng;
pub mod spatial;

pub use compose::{Compose, PairedPipelines};
pub use conversion::ToSample;
pub use core::{Chain, Transform};
pub use intensity::{
    AddChannel, Identity, NormalizeIntensity, RandShiftIntensity, ScaleIntensity,
    ThresholdIntensity,
};
pub use rng::{sample_seed, SampleRng};
pub use spatial::{
    Affine3, CenterCrop, Flip, Interpolation, RandAffine, RandFlip, RandRotate, RandomPatch,
    Rotate,
};
