use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Tool configuration: defaults, then an optional TOML file, then
/// `EMOFRAME_*` environment variables. Command-line flags are applied last
/// by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// FFmpeg binary, a path or a name looked up on `PATH`.
    pub ffmpeg: PathBuf,
    /// Frames sampled per second of video (`4`, `2.5`, `30000/1001`).
    pub fps: String,
    /// Decoder threads per video.
    pub decoder_threads: u32,
    /// Parent of the per-dataset directories (`enterface`, `rml`).
    pub data_root: PathBuf,
    /// Extension of frame images.
    pub frame_extension: String,
    /// Extension of source videos.
    pub video_extension: String,
    /// SCRFD ONNX model used for face detection.
    pub model: PathBuf,
    /// ONNX Runtime intra-op threads.
    pub inference_threads: usize,
    /// Output face width in pixels.
    pub face_width: u32,
    /// Width frames are resized to before detection.
    pub working_width: u32,
    /// Detector upsampling factor.
    pub upsample: u32,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            fps: "4".to_string(),
            decoder_threads: 1,
            data_root: home.join("data/datasets"),
            frame_extension: "jpg".to_string(),
            video_extension: "avi".to_string(),
            model: home.join("data/models/scrfd/det_10g.onnx"),
            inference_threads: 1,
            face_width: emoframe_core::extractor::DEFAULT_FACE_WIDTH,
            working_width: emoframe_core::extractor::DEFAULT_WORKING_WIDTH,
            upsample: emoframe_core::extractor::DEFAULT_UPSAMPLE,
        }
    }
}

impl Config {
    /// Load the file at `path` (or `$EMOFRAME_CONFIG`) if any, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("EMOFRAME_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Override fields from `EMOFRAME_*` variables looked up through `var`.
    /// Unparseable numbers are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("EMOFRAME_FFMPEG") {
            self.ffmpeg = PathBuf::from(v);
        }
        if let Some(v) = var("EMOFRAME_FPS") {
            self.fps = v;
        }
        if let Some(v) = var("EMOFRAME_DATA_ROOT") {
            self.data_root = PathBuf::from(v);
        }
        if let Some(v) = var("EMOFRAME_MODEL") {
            self.model = PathBuf::from(v);
        }
        parse_into(&var, "EMOFRAME_DECODER_THREADS", &mut self.decoder_threads);
        parse_into(&var, "EMOFRAME_INFERENCE_THREADS", &mut self.inference_threads);
        parse_into(&var, "EMOFRAME_FACE_WIDTH", &mut self.face_width);
        parse_into(&var, "EMOFRAME_WORKING_WIDTH", &mut self.working_width);
        parse_into(&var, "EMOFRAME_UPSAMPLE", &mut self.upsample);
    }
}

fn parse_into<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    if let Some(value) = var(key).and_then(|v| v.parse().ok()) {
        *slot = value;
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}
