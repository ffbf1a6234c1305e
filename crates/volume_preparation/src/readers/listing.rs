use crate::error::VolumeError;
use anyhow::{Context, Result};
use glob::Pattern;
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ordered `(image, label)` file pairs.
///
/// Pair `i` is the `i`-th image path and the `i`-th label path, so the two
/// lists must already be aligned (sorted names are the usual convention).
/// When the lists differ in length the extra entries are ignored.
///
/// # Example
/// ```ignore
/// let listing = FileListing::from_patterns("./data", "im*.nii.gz", "seg*.nii.gz", false)?;
/// for (image, label) in listing.iter() {
///     println!("{} <-> {}", image.display(), label.display());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileListing {
    pairs: Vec<(PathBuf, PathBuf)>,
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| {
        VolumeError::InvalidConfig(format!("Invalid file pattern '{}': {}", pattern, e)).into()
    })
}

/// Regular files under `dir` whose file name matches `pattern`, sorted.
/// Symlinks are skipped.
fn matching_files(dir: &Path, pattern: &Pattern, recurse: bool) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir).min_depth(1).follow_links(false);
    let walker = if recurse { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry
            .with_context(|| format!("Failed to read directory entry in {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name_matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.matches(name));
        if name_matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

impl FileListing {
    /// Lists `dir` once per pattern and pairs the sorted results.
    ///
    /// # Arguments
    /// - `image_glob` / `label_glob`: file-name patterns (e.g. `"im*.nii.gz"`).
    ///   They must not match the same file.
    /// - `recurse`: If `true`, scans subdirectories recursively.
    pub fn from_patterns(
        dir: impl AsRef<Path>,
        image_glob: &str,
        label_glob: &str,
        recurse: bool,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(VolumeError::FileNotFound {
                path: dir.to_path_buf(),
            }
            .into());
        }
        if !dir.is_dir() {
            return Err(VolumeError::InvalidConfig(format!(
                "Path is not a directory: {}",
                dir.display()
            ))
            .into());
        }

        let images = matching_files(dir, &compile(image_glob)?, recurse)?;
        let labels = matching_files(dir, &compile(label_glob)?, recurse)?;

        let label_set: HashSet<&PathBuf> = labels.iter().collect();
        if let Some(shared) = images.iter().find(|p| label_set.contains(p)) {
            return Err(VolumeError::InvalidConfig(format!(
                "Image pattern '{}' and label pattern '{}' both match {}",
                image_glob,
                label_glob,
                shared.display()
            ))
            .into());
        }

        let listing = Self::from_pairs(images, labels);
        info!(
            "Listed {} image/label pairs in {}",
            listing.len(),
            dir.display()
        );
        Ok(listing)
    }

    /// Zips two already aligned path lists.
    pub fn from_pairs(
        images: impl IntoIterator<Item = PathBuf>,
        labels: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let images: Vec<PathBuf> = images.into_iter().collect();
        let labels: Vec<PathBuf> = labels.into_iter().collect();
        if images.len() != labels.len() {
            warn!(
                "Found {} images but {} labels; using the first {} pairs",
                images.len(),
                labels.len(),
                images.len().min(labels.len())
            );
        }
        Self {
            pairs: images.into_iter().zip(labels).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(&Path, &Path)> {
        self.pairs
            .get(index)
            .map(|(image, label)| (image.as_path(), label.as_path()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.pairs
            .iter()
            .map(|(image, label)| (image.as_path(), label.as_path()))
    }
}
