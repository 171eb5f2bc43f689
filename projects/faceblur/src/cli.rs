use clap::{Parser, ValueEnum};
use std::path::PathBuf;

const MODEL_HELP: &str = "\
MODEL is a pretrained face detector:
  - YuNet ONNX (face_detection_yunet_2023mar.onnx), available from
    https://github.com/opencv/opencv_zoo/tree/main/models/face_detection_yunet
  - an OpenCV cascade XML (haarcascade_frontalface_default.xml)";

/// Detector backend requested on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorChoice {
    /// Pick the backend from the model file extension
    Auto,
    Yunet,
    Haar,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Detect faces in a video and blur them",
    long_about = None,
    arg_required_else_help = true,
    after_help = MODEL_HELP
)]
pub struct Args {
    /// Pretrained face detector model file
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Input video file
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Output video file
    #[arg(long, short, env = "FACEBLUR_OUTPUT", default_value = "out/output_test.mp4")]
    pub output: PathBuf,

    /// Downscale factor applied to every processed frame
    #[arg(long, env = "FACEBLUR_SCALE", default_value_t = 0.7)]
    pub scale: f64,

    /// Only process frames whose index is a multiple of this value
    #[arg(long, env = "FACEBLUR_FRAME_SKIP", default_value_t = 4)]
    pub frame_skip: usize,

    /// Gaussian blur sigma applied to each face region
    #[arg(long, env = "FACEBLUR_BLUR_SIGMA", default_value_t = 10.0)]
    pub blur_sigma: f64,

    /// Detector backend
    #[arg(long, value_enum, env = "FACEBLUR_DETECTOR", default_value_t = DetectorChoice::Auto)]
    pub detector: DetectorChoice,

    /// Minimum detection score (YuNet only)
    #[arg(long, env = "FACEBLUR_SCORE_THRESHOLD", default_value_t = 0.9)]
    pub score_threshold: f32,

    /// NMS IoU threshold (YuNet only)
    #[arg(long, env = "FACEBLUR_NMS_THRESHOLD", default_value_t = 0.3)]
    pub nms_threshold: f32,

    /// Maximum number of candidate boxes kept before NMS (YuNet only)
    #[arg(long, env = "FACEBLUR_TOP_K", default_value_t = 5000)]
    pub top_k: i32,

    /// Show each output frame in a window; any key press stops processing
    #[arg(long, env = "FACEBLUR_PREVIEW")]
    pub preview: bool,

    /// Write a JSON run report to this path
    #[arg(long, env = "FACEBLUR_REPORT")]
    pub report: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
