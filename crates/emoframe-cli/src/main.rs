use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use emoframe_core::{
    DebugWriter, FaceConfig, FaceExtractor, FaceSelection, LayoutStrategy, Scan, ScrfdDetector,
    TreeMapper,
};
use emoframe_media::{Dataset, Ffmpeg, FrameExtractor, FrameRate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "emoframe", about = "Prepare frame and face datasets from emotion-recognition videos")]
struct Cli {
    /// TOML configuration file (defaults to $EMOFRAME_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split every dataset video into frames with FFmpeg
    Frames {
        /// Dataset layout (enterface or rml)
        #[arg(long)]
        dataset: Dataset,
        /// Dataset root (default: <data_root>/<dataset>)
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Frames per second to sample (e.g. 4, 2.5, 30000/1001)
        #[arg(long)]
        fps: Option<String>,
        /// FFmpeg binary
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract one face per frame image
    Faces {
        /// Path to the face detection model
        #[arg(short = 'p', long = "shape-predictor")]
        model: Option<PathBuf>,
        /// Subset label, recorded in the logs only
        #[arg(long, default_value = "Train")]
        subset: String,
        /// Dataset whose frames are processed when --frame-dir is not given
        #[arg(long, default_value = "rml")]
        dataset: Dataset,
        /// Frame directory (default: <data_root>/<dataset>/frames)
        #[arg(long, alias = "rml_frame_dir")]
        frame_dir: Option<PathBuf>,
        /// Output directory (default: the frame directory renamed to `faces`)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Width of the output faces in pixels
        #[arg(long)]
        face_width: Option<u32>,
        /// Align faces using eye landmarks
        #[arg(long)]
        align: bool,
        /// Pick the most confident face instead of the first one returned
        #[arg(long)]
        most_confident: bool,
        /// Ignore detections below this confidence
        #[arg(long)]
        min_confidence: Option<f32>,
        /// Write annotated intermediate images
        #[arg(long)]
        debug: bool,
        /// Where --debug writes its images
        #[arg(long, default_value = "emoframe-debug")]
        debug_dir: PathBuf,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Frames {
            dataset,
            data_dir,
            fps,
            ffmpeg,
            json,
        } => {
            if let Some(fps) = fps {
                config.fps = fps;
            }
            if let Some(ffmpeg) = ffmpeg {
                config.ffmpeg = ffmpeg;
            }
            let data_dir = data_dir.unwrap_or_else(|| config.data_root.join(dataset.dir_name()));
            run_frames(&config, dataset, &data_dir, json)
        }
        Commands::Faces {
            model,
            subset,
            dataset,
            frame_dir,
            out_dir,
            face_width,
            align,
            most_confident,
            min_confidence,
            debug,
            debug_dir,
            json,
        } => {
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(width) = face_width {
                config.face_width = width;
            }
            let frame_dir = frame_dir
                .unwrap_or_else(|| config.data_root.join(dataset.dir_name()).join(emoframe_media::dataset::FRAMES_DIR));
            tracing::info!(subset = %subset, frame_dir = %frame_dir.display(), "face extraction");

            let face_config = FaceConfig {
                face_width: config.face_width,
                working_width: config.working_width,
                upsample: config.upsample,
                align,
                selection: if most_confident {
                    FaceSelection::MostConfident
                } else {
                    FaceSelection::First
                },
                min_confidence,
            };
            let debug_dir = debug.then_some(debug_dir);
            run_faces(&config, face_config, &frame_dir, out_dir.as_deref(), debug_dir, json)
        }
    }
}

fn run_frames(config: &Config, dataset: Dataset, data_dir: &Path, json: bool) -> Result<()> {
    let rate: FrameRate = config.fps.parse()?;
    let ffmpeg = Ffmpeg::resolve(&config.ffmpeg)?
        .threads(config.decoder_threads)
        .extension(config.frame_extension.clone());
    tracing::info!(
        dataset = %dataset,
        data_dir = %data_dir.display(),
        ffmpeg = %ffmpeg.binary().display(),
        fps = %rate,
        "frame extraction"
    );

    let plan = dataset.frame_plan(data_dir, &[config.video_extension.as_str()]);
    std::fs::create_dir_all(&plan.frame_root)
        .with_context(|| format!("creating {}", plan.frame_root.display()))?;

    let report = FrameExtractor::new(ffmpeg, rate).run(&plan.scan, &plan.mapper)?;
    print_report(&report, json)
}

fn run_faces(
    config: &Config,
    face_config: FaceConfig,
    frame_dir: &Path,
    out_dir: Option<&Path>,
    debug_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mapper = face_mapper(frame_dir, out_dir)?;
    tracing::info!(dest = %mapper.dest_root.display(), align = face_config.align, "writing faces");

    let detector = ScrfdDetector::load(&config.model, config.inference_threads)
        .with_context(|| format!("loading detector {}", config.model.display()))?;

    let mut extractor = FaceExtractor::new(detector, face_config);
    if let Some(dir) = debug_dir {
        let writer = DebugWriter::new(&dir).with_context(|| format!("creating {}", dir.display()))?;
        extractor = extractor.with_observer(Box::new(writer));
    }

    let scan = Scan::new(frame_dir, &[config.frame_extension.as_str()]);
    let report = extractor.run(&scan, &mapper)?;
    print_report(&report, json)
}

/// Faces mirror the frame tree: into `out_dir` when given, otherwise into
/// a sibling of `frame_dir` with the last segment renamed to `faces`.
fn face_mapper(frame_dir: &Path, out_dir: Option<&Path>) -> Result<TreeMapper> {
    if let Some(out) = out_dir {
        return Ok(TreeMapper::new(frame_dir, out, LayoutStrategy::DepthSlice { skip: 0 }));
    }

    let (Some(parent), Some(name)) = (frame_dir.parent(), frame_dir.file_name()) else {
        bail!("cannot derive a faces directory from {}; pass --out-dir", frame_dir.display());
    };
    let name = name.to_string_lossy().into_owned();
    if name == "faces" {
        bail!("frame directory is already named `faces`; pass --out-dir");
    }
    Ok(TreeMapper::new(
        parent,
        parent,
        LayoutStrategy::SegmentRename {
            from: name,
            to: "faces".to_string(),
        },
    ))
}

fn print_report<T: Serialize + std::fmt::Debug>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        tracing::debug!(?report, "run report");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_faces_flags() {
        let cli = Cli::parse_from([
            "emoframe", "faces", "-p", "/m/det.onnx", "--face-width", "112", "--align", "--rml_frame_dir", "/d/frames",
        ]);
        let Commands::Faces { model, face_width, align, frame_dir, subset, debug, .. } = cli.command else {
            panic!("expected faces");
        };
        assert_eq!(model, Some(PathBuf::from("/m/det.onnx")));
        assert_eq!(face_width, Some(112));
        assert!(align);
        assert!(!debug);
        assert_eq!(frame_dir, Some(PathBuf::from("/d/frames")));
        assert_eq!(subset, "Train");
    }

    #[test]
    fn test_frames_requires_known_dataset() {
        assert!(Cli::try_parse_from(["emoframe", "frames", "--dataset", "ravdess"]).is_err());
        let cli = Cli::try_parse_from(["emoframe", "frames", "--dataset", "enterface", "--fps", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Frames { dataset: Dataset::Enterface, .. }));
    }

    #[test]
    fn test_face_mapper_renames_frame_dir() {
        let mapper = face_mapper(Path::new("/data/rml/frames"), None).unwrap();
        let dest = mapper
            .map_file(Path::new("/data/rml/frames/actor1/clip1/0000005.jpg"))
            .unwrap();
        assert_eq!(dest, PathBuf::from("/data/rml/faces/actor1/clip1/0000005.jpg"));
    }

    #[test]
    fn test_face_mapper_explicit_out_dir() {
        let mapper = face_mapper(Path::new("/data/rml/frames"), Some(Path::new("/out"))).unwrap();
        let dest = mapper
            .map_file(Path::new("/data/rml/frames/a/0000001.jpg"))
            .unwrap();
        assert_eq!(dest, PathBuf::from("/out/a/0000001.jpg"));
    }

    #[test]
    fn test_face_mapper_rejects_faces_dir() {
        assert!(face_mapper(Path::new("/data/faces"), None).is_err());
        assert!(face_mapper(Path::new("/"), None).is_err());
    }
}
