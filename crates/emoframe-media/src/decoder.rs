//! FFmpeg frame decoding.

use crate::error::{MediaError, MediaResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

/// Digits in a frame file name (`0000001.jpg`).
pub const FRAME_INDEX_WIDTH: usize = 7;

/// Name of the `index`-th frame (1-based) as FFmpeg's `%07d` template writes it.
pub fn frame_file_name(index: u32, extension: &str) -> String {
    format!("{index:0width$}.{extension}", width = FRAME_INDEX_WIDTH)
}

/// A positive sampling rate in frames per second, kept as a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    num: u64,
    den: u64,
}

impl FrameRate {
    pub fn new(num: u64, den: u64) -> MediaResult<Self> {
        if num == 0 || den == 0 {
            return Err(MediaError::InvalidFrameRate(format!("{num}/{den}")));
        }
        let g = gcd(num, den);
        Ok(Self { num: num / g, den: den / g })
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self { num: 4, den: 1 }
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl FromStr for FrameRate {
    type Err = MediaError;

    /// Accepts `4`, `2.5` or `30000/1001`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MediaError::InvalidFrameRate(s.to_string());
        let s = s.trim();

        if let Some((n, d)) = s.split_once('/') {
            let num = n.trim().parse().map_err(|_| invalid())?;
            let den = d.trim().parse().map_err(|_| invalid())?;
            return FrameRate::new(num, den).map_err(|_| invalid());
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if frac.len() > 9 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let den = 10u64.pow(frac.len() as u32);
        let whole: u64 = if whole.is_empty() && !frac.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: u64 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| invalid())? };
        let num = whole
            .checked_mul(den)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;
        FrameRate::new(num, den).map_err(|_| invalid())
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl Serialize for FrameRate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a decoder invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStatus {
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
}

/// Turns one video into numbered frame images.
pub trait FrameDecoder {
    /// Decode `video` into `out_dir` at `rate`, returning how the decoder exited.
    ///
    /// Only failing to start the decoder is an error; a decoder that runs
    /// and fails reports it through [`DecodeStatus`].
    fn decode(&self, video: &Path, out_dir: &Path, rate: FrameRate) -> MediaResult<DecodeStatus>;
}

/// FFmpeg invocation settings.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    threads: u32,
    extension: String,
    log_level: Option<String>,
    overwrite: bool,
}

impl Ffmpeg {
    /// Resolve `binary` (a path or a name on `PATH`). Fails if it cannot be found.
    pub fn resolve(binary: impl AsRef<Path>) -> MediaResult<Self> {
        let binary = binary.as_ref();
        let resolved = which::which(binary)
            .map_err(|e| MediaError::FfmpegNotFound(format!("{}: {e}", binary.display())))?;
        tracing::debug!(ffmpeg = %resolved.display(), "resolved decoder");
        Ok(Self {
            binary: resolved,
            threads: 1,
            extension: "jpg".to_string(),
            log_level: None,
            overwrite: true,
        })
    }

    /// Decoder thread count (default 1).
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Frame image extension without the dot (default `jpg`).
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Pass `-loglevel <level>` to FFmpeg.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Whether existing frames may be overwritten (`-y`, default true).
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Output template, e.g. `<out_dir>/%07d.jpg`.
    pub fn output_template(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("%0{FRAME_INDEX_WIDTH}d.{}", self.extension))
    }

    /// Build the command for one video without running it.
    pub fn command(&self, video: &Path, out_dir: &Path, rate: FrameRate) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(level) = &self.log_level {
            cmd.arg("-loglevel").arg(level);
        }
        cmd.arg("-nostdin");
        if self.overwrite {
            cmd.arg("-y");
        }
        cmd.arg("-i")
            .arg(video)
            .arg("-r")
            .arg(rate.to_string())
            .arg("-threads")
            .arg(self.threads.to_string())
            .arg(self.output_template(out_dir));
        cmd
    }
}

impl FrameDecoder for Ffmpeg {
    fn decode(&self, video: &Path, out_dir: &Path, rate: FrameRate) -> MediaResult<DecodeStatus> {
        let mut cmd = self.command(video, out_dir, rate);
        tracing::debug!(command = ?cmd, "running ffmpeg");

        let status = cmd
            .stdin(Stdio::null())
            .status()
            .map_err(|source| MediaError::Spawn {
                video: video.to_path_buf(),
                source,
            })?;

        Ok(DecodeStatus {
            success: status.success(),
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_frame_rate_integer() {
        let r: FrameRate = "4".parse().unwrap();
        assert_eq!(r.to_string(), "4");
        assert_eq!(r, FrameRate::default());
    }

    #[test]
    fn test_frame_rate_decimal_and_fraction() {
        let r: FrameRate = "2.5".parse().unwrap();
        assert_eq!(r.to_string(), "5/2");
        assert!((r.as_f64() - 2.5).abs() < 1e-12);

        let r: FrameRate = "30000/1001".parse().unwrap();
        assert_eq!(r.to_string(), "30000/1001");

        let r: FrameRate = "0.5".parse().unwrap();
        assert_eq!(r.to_string(), "1/2");
        let r: FrameRate = ".25".parse().unwrap();
        assert_eq!(r.to_string(), "1/4");
    }

    #[test]
    fn test_frame_rate_rejects_bad_input() {
        for bad in ["0", "0/1", "1/0", "-4", "abc", "", "4.x", "1/2/3", "."] {
            assert!(bad.parse::<FrameRate>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(1, "jpg"), "0000001.jpg");
        assert_eq!(frame_file_name(1234567, "png"), "1234567.png");
    }

    fn ffmpeg() -> Ffmpeg {
        Ffmpeg {
            binary: PathBuf::from("/opt/ffmpeg/bin/ffmpeg"),
            threads: 1,
            extension: "jpg".into(),
            log_level: None,
            overwrite: true,
        }
    }

    #[test]
    fn test_command_line() {
        let cmd = ffmpeg().command(
            Path::new("/data/raw/actor 1/clip1.avi"),
            Path::new("/data/frames/actor 1/clip1"),
            FrameRate::default(),
        );
        assert_eq!(cmd.get_program(), OsStr::new("/opt/ffmpeg/bin/ffmpeg"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-nostdin",
                "-y",
                "-i",
                "/data/raw/actor 1/clip1.avi",
                "-r",
                "4",
                "-threads",
                "1",
                "/data/frames/actor 1/clip1/%07d.jpg",
            ]
        );
    }

    #[test]
    fn test_command_options() {
        let cmd = ffmpeg()
            .log_level("error")
            .overwrite(false)
            .threads(0)
            .extension("png")
            .command(Path::new("v.avi"), Path::new("out"), "2.5".parse().unwrap());
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["-loglevel", "error", "-nostdin", "-i", "v.avi", "-r", "5/2", "-threads", "1", "out/%07d.png"]
        );
    }

    #[test]
    fn test_resolve_missing_binary() {
        let err = Ffmpeg::resolve("/definitely/not/here/ffmpeg").unwrap_err();
        assert!(matches!(err, MediaError::FfmpegNotFound(_)));
    }
}
