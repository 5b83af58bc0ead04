//! Directory conventions of the supported corpora.

use emoframe_core::{LayoutStrategy, Scan, TreeMapper};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extension of the source videos in both corpora.
pub const VIDEO_EXTENSION: &str = "avi";
/// Directory frames are written to, relative to the dataset root.
pub const FRAMES_DIR: &str = "frames";

/// A known dataset layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    /// eNTERFACE'05: `<root>/raw/<actor>/…/<clip>.avi`.
    Enterface,
    /// RML: `<root>/<set>/<subject>/…/<clip>.avi`.
    Rml,
}

/// Where to look for videos and where their frames go.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub scan: Scan,
    pub mapper: TreeMapper,
    /// Created before the first video is processed.
    pub frame_root: PathBuf,
}

impl Dataset {
    /// Directory name under `~/data/datasets`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Dataset::Enterface => "enterface",
            Dataset::Rml => "rml",
        }
    }

    /// Build the scan and path mapping for a dataset rooted at `root`.
    pub fn frame_plan(&self, root: &Path, extensions: &[&str]) -> FramePlan {
        let frame_root = root.join(FRAMES_DIR);
        match self {
            Dataset::Enterface => FramePlan {
                scan: Scan::new(root.join("raw"), extensions),
                mapper: TreeMapper::new(
                    root,
                    root,
                    LayoutStrategy::SegmentRename {
                        from: "raw".into(),
                        to: FRAMES_DIR.into(),
                    },
                ),
                frame_root,
            },
            // Videos sit at least two directories below the root; the
            // mirrored path keeps every component below the root.
            Dataset::Rml => FramePlan {
                scan: Scan::new(root, extensions)
                    .min_depth(3)
                    .exclude(frame_root.clone()),
                mapper: TreeMapper::new(root, frame_root.clone(), LayoutStrategy::DepthSlice { skip: 0 }),
                frame_root,
            },
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enterface" => Ok(Dataset::Enterface),
            "rml" => Ok(Dataset::Rml),
            other => Err(format!("unknown dataset `{other}` (expected enterface or rml)")),
        }
    }
}
