//! Volume sources on disk.

pub mod listing;
pub mod nifti;

pub use listing::FileListing;
pub use self::nifti::NiftiReader;

use crate::volume::Volume;
use anyhow::Result;
use std::path::Path;

/// Decodes one file into a [`Volume`].
///
/// Implementations report a missing file as `FileNotFound` and unreadable
/// content as `Decode`.
pub trait VolumeReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Volume>;
}
