//! Mirrored output trees.
//!
//! A layout maps a source file to its destination under a parallel tree.
//! Each dataset picks one named strategy; the mapping itself is a pure
//! function of `(source_root, source_path, dest_root)` and never touches
//! the filesystem.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{} is not under layout root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
    #[error("{} has no `{segment}` path segment to rename", path.display())]
    SegmentNotFound { path: PathBuf, segment: String },
    #[error("{} has nothing left after dropping {skip} leading components", path.display())]
    TooShallow { path: PathBuf, skip: usize },
}

/// Strategy for rewriting a path relative to the layout root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutStrategy {
    /// Rename the first relative component equal to `from` to `to`.
    ///
    /// Only whole components match: `rawdata/x.avi` is left alone by a
    /// `raw` rename and reported as [`LayoutError::SegmentNotFound`].
    SegmentRename { from: String, to: String },
    /// Drop the first `skip` relative components and keep the rest.
    DepthSlice { skip: usize },
}

impl LayoutStrategy {
    /// Compute the destination path for `source_path`.
    pub fn destination(
        &self,
        source_root: &Path,
        source_path: &Path,
        dest_root: &Path,
    ) -> Result<PathBuf, LayoutError> {
        let relative =
            source_path
                .strip_prefix(source_root)
                .map_err(|_| LayoutError::OutsideRoot {
                    path: source_path.to_path_buf(),
                    root: source_root.to_path_buf(),
                })?;

        let components: Vec<OsString> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_os_string()),
                _ => None,
            })
            .collect();

        let rewritten: Vec<OsString> = match self {
            LayoutStrategy::SegmentRename { from, to } => {
                let pos = components
                    .iter()
                    .position(|c| c.as_os_str() == from.as_str())
                    .ok_or_else(|| LayoutError::SegmentNotFound {
                        path: source_path.to_path_buf(),
                        segment: from.clone(),
                    })?;
                let mut out = components;
                out[pos] = OsString::from(to);
                out
            }
            LayoutStrategy::DepthSlice { skip } => {
                if components.len() <= *skip {
                    return Err(LayoutError::TooShallow {
                        path: source_path.to_path_buf(),
                        skip: *skip,
                    });
                }
                components.into_iter().skip(*skip).collect()
            }
        };

        let mut dest = dest_root.to_path_buf();
        dest.extend(rewritten);
        Ok(dest)
    }
}

/// A strategy bound to concrete source and destination roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMapper {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub strategy: LayoutStrategy,
}

impl TreeMapper {
    pub fn new(
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
        strategy: LayoutStrategy,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            strategy,
        }
    }

    /// Destination for a single file, keeping its file name.
    pub fn map_file(&self, source: &Path) -> Result<PathBuf, LayoutError> {
        self.strategy
            .destination(&self.source_root, source, &self.dest_root)
    }

    /// Destination directory for a container file such as a video:
    /// the mapped path with its final extension removed.
    pub fn map_to_dir(&self, source: &Path) -> Result<PathBuf, LayoutError> {
        Ok(self.map_file(source)?.with_extension(""))
    }
}
