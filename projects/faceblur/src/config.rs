use crate::cli::Args;
use crate::pipeline::detection::DetectorKind;
use crate::pipeline::orchestrator::FrameSkip;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Settings needed to load a face detector
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    pub model_path: PathBuf,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: i32,
}

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct FaceBlurConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub report: Option<PathBuf>,
    pub detector: DetectorConfig,
    pub scale: f64,
    pub frame_skip: FrameSkip,
    pub blur_sigma: f64,
    pub preview: bool,
}

impl FaceBlurConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        if !(args.scale.is_finite() && args.scale > 0.0 && args.scale <= 1.0) {
            bail!("--scale must be in (0, 1], got {}", args.scale);
        }
        if !(args.blur_sigma.is_finite() && args.blur_sigma > 0.0) {
            bail!("--blur-sigma must be positive, got {}", args.blur_sigma);
        }
        if !(0.0..=1.0).contains(&args.score_threshold) {
            bail!(
                "--score-threshold must be in [0, 1], got {}",
                args.score_threshold
            );
        }
        if !(0.0..=1.0).contains(&args.nms_threshold) {
            bail!(
                "--nms-threshold must be in [0, 1], got {}",
                args.nms_threshold
            );
        }
        if args.top_k <= 0 {
            bail!("--top-k must be positive, got {}", args.top_k);
        }

        let frame_skip = FrameSkip::new(args.frame_skip)?;
        let kind = DetectorKind::resolve(args.detector, &args.model)?;

        Ok(Self {
            input: args.video.clone(),
            output: args.output.clone(),
            report: args.report.clone(),
            detector: DetectorConfig {
                kind,
                model_path: args.model.clone(),
                score_threshold: args.score_threshold,
                nms_threshold: args.nms_threshold,
                top_k: args.top_k,
            },
            scale: args.scale,
            frame_skip,
            blur_sigma: args.blur_sigma,
            preview: args.preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["faceblur", "face_detection_yunet_2023mar.onnx", "in.mp4"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = FaceBlurConfig::from_args(&parse(&[])).unwrap();
        assert_eq!(config.detector.kind, DetectorKind::YuNet);
        assert_eq!(config.frame_skip.interval(), 4);
        assert_eq!(config.input, PathBuf::from("in.mp4"));
        assert!(config.report.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_scale() {
        assert!(FaceBlurConfig::from_args(&parse(&["--scale", "0"])).is_err());
        assert!(FaceBlurConfig::from_args(&parse(&["--scale", "1.5"])).is_err());
        assert!(FaceBlurConfig::from_args(&parse(&["--scale", "1.0"])).is_ok());
    }

    #[test]
    fn test_rejects_zero_frame_skip() {
        assert!(FaceBlurConfig::from_args(&parse(&["--frame-skip", "0"])).is_err());
    }

    #[test]
    fn test_rejects_bad_detector_settings() {
        assert!(FaceBlurConfig::from_args(&parse(&["--blur-sigma", "0"])).is_err());
        assert!(FaceBlurConfig::from_args(&parse(&["--score-threshold", "1.2"])).is_err());
        assert!(FaceBlurConfig::from_args(&parse(&["--top-k", "0"])).is_err());
    }
}
