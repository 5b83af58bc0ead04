//! Recursive file discovery under a dataset root.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("scan root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Which files a scan collects.
#[derive(Debug, Clone)]
pub struct Scan {
    pub root: PathBuf,
    /// Lower-case extensions without the leading dot.
    pub extensions: Vec<String>,
    /// Minimum depth below `root` (files directly in `root` have depth 1).
    pub min_depth: usize,
    /// Subtrees never descended into.
    pub exclude: Vec<PathBuf>,
}

impl Scan {
    pub fn new(root: impl Into<PathBuf>, extensions: &[&str]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            min_depth: 1,
            exclude: Vec::new(),
        }
    }

    pub fn min_depth(mut self, depth: usize) -> Self {
        self.min_depth = depth;
        self
    }

    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude.push(path.into());
        self
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Collect matching files, sorted by path so runs are reproducible.
    ///
    /// An empty tree yields an empty list; an unreadable entry aborts.
    pub fn collect(&self) -> Result<Vec<PathBuf>, DiscoverError> {
        if !self.root.is_dir() {
            return Err(DiscoverError::RootNotFound(self.root.clone()));
        }

        // Depth is checked per entry: walkdir's own `min_depth` would hide
        // shallow directories from the exclusion filter.
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.exclude.iter().any(|x| e.path() == x.as_path()));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|source| DiscoverError::Walk {
                root: self.root.clone(),
                source,
            })?;
            if entry.depth() >= self.min_depth && entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        tracing::debug!(root = %self.root.display(), count = files.len(), "scan complete");
        Ok(files)
    }
}
