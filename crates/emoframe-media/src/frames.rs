//! The video-to-frames batch job.

use crate::decoder::{FrameDecoder, FrameRate};
use crate::error::{MediaError, MediaResult};
use emoframe_core::{Scan, TreeMapper};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub videos: usize,
    pub succeeded: usize,
    /// Videos whose decoder failed to start or exited unsuccessfully.
    pub failed: Vec<PathBuf>,
}

/// Splits every video under a scan root into frame images.
pub struct FrameExtractor<D> {
    decoder: D,
    rate: FrameRate,
}

impl<D: FrameDecoder> FrameExtractor<D> {
    pub fn new(decoder: D, rate: FrameRate) -> Self {
        Self { decoder, rate }
    }

    /// Decode each video found by `scan` into the directory `mapper` gives it.
    ///
    /// Decoder failures are logged and recorded but never stop the batch.
    pub fn run(&self, scan: &Scan, mapper: &TreeMapper) -> MediaResult<FrameReport> {
        let videos = scan.collect()?;
        tracing::info!(
            root = %scan.root.display(),
            videos = videos.len(),
            fps = %self.rate,
            "splitting videos into frames"
        );

        let mut report = FrameReport::default();
        for video in &videos {
            let dest = mapper.map_to_dir(video)?;
            report.videos += 1;
            if self.split(video, &dest)? {
                report.succeeded += 1;
            } else {
                report.failed.push(video.clone());
            }
        }

        tracing::info!(
            videos = report.videos,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "frame extraction finished"
        );
        Ok(report)
    }

    /// Split one video. Returns whether the decoder succeeded.
    pub fn split(&self, video: &Path, dest: &Path) -> MediaResult<bool> {
        if !dest.is_dir() {
            std::fs::create_dir_all(dest).map_err(|source| MediaError::CreateDir {
                path: dest.to_path_buf(),
                source,
            })?;
        }

        tracing::info!(src = %video.display(), dest = %dest.display(), "extracting");
        match self.decoder.decode(video, dest, self.rate) {
            Ok(status) if status.success => Ok(true),
            Ok(status) => {
                tracing::warn!(
                    src = %video.display(),
                    code = ?status.code,
                    "decoder exited unsuccessfully"
                );
                Ok(false)
            }
            Err(err @ MediaError::Spawn { .. }) => {
                tracing::error!(src = %video.display(), error = %err, "decoder did not start");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{frame_file_name, DecodeStatus};
    use emoframe_core::LayoutStrategy;
    use std::cell::RefCell;
    use std::fs;

    /// Writes three frames per video; videos named `broken*` fail.
    struct StubDecoder {
        calls: RefCell<Vec<(PathBuf, PathBuf, FrameRate)>>,
    }

    impl StubDecoder {
        fn new() -> Self {
            Self { calls: RefCell::new(Vec::new()) }
        }
    }

    impl FrameDecoder for StubDecoder {
        fn decode(&self, video: &Path, out_dir: &Path, rate: FrameRate) -> MediaResult<DecodeStatus> {
            assert!(out_dir.is_dir(), "output dir must exist before decoding");
            self.calls
                .borrow_mut()
                .push((video.to_path_buf(), out_dir.to_path_buf(), rate));

            let name = video.file_name().unwrap().to_string_lossy();
            if name.starts_with("broken") {
                return Ok(DecodeStatus { success: false, code: Some(1) });
            }
            if name.starts_with("missing") {
                return Err(MediaError::Spawn {
                    video: video.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                });
            }
            for i in 1..=3 {
                fs::write(out_dir.join(frame_file_name(i, "jpg")), b"frame").unwrap();
            }
            Ok(DecodeStatus { success: true, code: Some(0) })
        }
    }

    fn enterface(root: &Path) -> (Scan, TreeMapper) {
        let scan = Scan::new(root.join("raw"), &["avi"]);
        let mapper = TreeMapper::new(
            root,
            root,
            LayoutStrategy::SegmentRename { from: "raw".into(), to: "frames".into() },
        );
        (scan, mapper)
    }

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"video").unwrap();
    }

    fn sorted_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_one_directory_per_video() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "raw/actor1/clip1.avi");
        touch(root, "raw/actor1/clip2.avi");
        touch(root, "raw/actor2/s1/clip1.avi");

        let (scan, mapper) = enterface(root);
        let extractor = FrameExtractor::new(StubDecoder::new(), FrameRate::default());
        let report = extractor.run(&scan, &mapper).unwrap();

        assert_eq!(report, FrameReport { videos: 3, succeeded: 3, failed: vec![] });
        assert_eq!(sorted_names(&root.join("frames/actor1")), vec!["clip1", "clip2"]);
        assert_eq!(
            sorted_names(&root.join("frames/actor1/clip1")),
            vec!["0000001.jpg", "0000002.jpg", "0000003.jpg"]
        );
        assert!(root.join("frames/actor2/s1/clip1").is_dir());
    }

    #[test]
    fn test_decoder_receives_rate_and_mirrored_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "raw/actor1/clip1.avi");

        let (scan, mapper) = enterface(root);
        let rate: FrameRate = "2.5".parse().unwrap();
        let extractor = FrameExtractor::new(StubDecoder::new(), rate);
        extractor.run(&scan, &mapper).unwrap();

        let calls = extractor.decoder.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, root.join("raw/actor1/clip1.avi"));
        assert_eq!(calls[0].1, root.join("frames/actor1/clip1"));
        assert_eq!(calls[0].2, rate);
    }

    #[test]
    fn test_failures_do_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "raw/a/broken.avi");
        touch(root, "raw/a/clip.avi");
        touch(root, "raw/a/missing.avi");
        touch(root, "raw/b/zclip.avi");

        let (scan, mapper) = enterface(root);
        let extractor = FrameExtractor::new(StubDecoder::new(), FrameRate::default());
        let report = extractor.run(&scan, &mapper).unwrap();

        assert_eq!(report.videos, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(
            report.failed,
            vec![root.join("raw/a/broken.avi"), root.join("raw/a/missing.avi")]
        );
        assert!(root.join("frames/b/zclip/0000001.jpg").is_file());
        // Destination exists even for the failed video.
        assert!(root.join("frames/a/broken").is_dir());
    }

    #[test]
    fn test_no_videos_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("raw")).unwrap();

        let (scan, mapper) = enterface(root);
        let extractor = FrameExtractor::new(StubDecoder::new(), FrameRate::default());
        let report = extractor.run(&scan, &mapper).unwrap();
        assert_eq!(report, FrameReport::default());
        assert!(!root.join("frames").exists());
    }

    #[test]
    fn test_rerun_reuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "raw/a/clip.avi");

        let (scan, mapper) = enterface(root);
        let extractor = FrameExtractor::new(StubDecoder::new(), FrameRate::default());
        extractor.run(&scan, &mapper).unwrap();
        let report = extractor.run(&scan, &mapper).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(sorted_names(&root.join("frames/a/clip")).len(), 3);
    }
}
