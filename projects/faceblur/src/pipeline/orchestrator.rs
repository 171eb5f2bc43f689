// Pipeline orchestrator: one pass over the input video
//
// Reads frames, drops the ones the frame-skip policy rejects, downscales the
// rest, detects and blurs faces, then writes and optionally previews them.

use crate::config::FaceBlurConfig;
use crate::pipeline::blur::blur_faces;
use crate::pipeline::detection::{load_detector, FaceDetector};
use crate::pipeline::geometry::scaled_size;
use crate::pipeline::types::{FrameRecord, RunSummary, StopReason};
use crate::preview::{FramePreview, WindowPreview, WINDOW_NAME};
use crate::run_artifacts::{write_report, RunReport};
use crate::video::opencv_reader::OpencvReader;
use crate::video::opencv_writer::OpencvWriter;
use crate::video::processor::{process_video, Flow};
use crate::video::{FrameSink, VideoReader};
use anyhow::{bail, Context, Result};
use opencv::core::{Mat, Size};
use opencv::imgproc;

/// Process only frames whose index is a multiple of the interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSkip(usize);

impl FrameSkip {
    pub fn new(interval: usize) -> Result<Self> {
        if interval == 0 {
            bail!("--frame-skip must be at least 1");
        }
        Ok(Self(interval))
    }

    pub fn interval(&self) -> usize {
        self.0
    }

    pub fn should_process(&self, index: usize) -> bool {
        index % self.0 == 0
    }

    /// Frame rate for the kept frames so the output lasts as long as the input
    pub fn output_fps(&self, input_fps: f64) -> f64 {
        input_fps / self.0 as f64
    }
}

/// Per-run settings of the frame loop
#[derive(Debug, Clone, Copy)]
pub struct BlurOptions {
    /// Every processed frame is resized to exactly this size
    pub output_size: Size,
    pub frame_skip: FrameSkip,
    pub blur_sigma: f64,
    /// Keep a `FrameRecord` per processed frame (only needed for the report)
    pub keep_records: bool,
}

pub struct BlurOutcome {
    pub summary: RunSummary,
    pub frames: Vec<FrameRecord>,
}

/// Run the read/skip/resize/detect/blur/write loop until the input ends
/// or the preview asks to quit.
pub fn blur_video(
    reader: &mut dyn VideoReader,
    sink: &mut dyn FrameSink,
    detector: &mut dyn FaceDetector,
    mut preview: Option<&mut dyn FramePreview>,
    options: &BlurOptions,
) -> Result<BlurOutcome> {
    let mut frames = Vec::new();
    let mut frames_written = 0;
    let mut faces_detected = 0;
    let mut faces_blurred = 0;

    let stats = process_video(reader, |index: usize, frame: Mat| -> Result<Flow> {
        if !options.frame_skip.should_process(index) {
            return Ok(Flow::Continue);
        }

        let mut resized = Mat::default();
        imgproc::resize(
            &frame,
            &mut resized,
            options.output_size,
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let faces = detector
            .detect(&resized)
            .with_context(|| format!("Face detection failed on frame {}", index))?;
        tracing::debug!("Frame {}: number of faces detected: {}", index, faces.len());

        let blurred = blur_faces(&mut resized, &faces, options.blur_sigma)?;
        sink.write(&resized)?;

        frames_written += 1;
        faces_detected += faces.len();
        faces_blurred += blurred;
        if options.keep_records {
            frames.push(FrameRecord {
                index,
                faces,
                blurred,
            });
        }

        if let Some(preview) = preview.as_mut() {
            if preview.show(&resized)? {
                return Ok(Flow::Stop);
            }
        }

        Ok(Flow::Continue)
    })?;

    let summary = RunSummary {
        frames_read: stats.frames_read,
        frames_processed: frames_written,
        frames_written,
        faces_detected,
        faces_blurred,
        stop_reason: if stats.stopped_early {
            StopReason::UserQuit
        } else {
            StopReason::EndOfStream
        },
        elapsed: stats.duration,
    };

    Ok(BlurOutcome { summary, frames })
}

/// Full run: load the model, open input and output, blur, and write the report.
pub fn run_faceblur(config: &FaceBlurConfig) -> Result<RunSummary> {
    let mut detector = load_detector(&config.detector)?;
    run_with_detector(config, detector.as_mut())
}

/// Everything after model loading, with the detector supplied by the caller.
pub fn run_with_detector(
    config: &FaceBlurConfig,
    detector: &mut dyn FaceDetector,
) -> Result<RunSummary> {
    let mut reader = OpencvReader::open(&config.input)
        .with_context(|| format!("Error opening input file {}", config.input.display()))?;
    let props = reader.properties();
    if props.width <= 0 || props.height <= 0 {
        bail!(
            "Input {} reports invalid frame size {}x{}",
            config.input.display(),
            props.width,
            props.height
        );
    }

    let output_size = scaled_size(props.width, props.height, config.scale);
    let output_fps = config.frame_skip.output_fps(props.fps);
    let mut writer = OpencvWriter::create(&config.output, props.fourcc, output_fps, output_size)?;

    let mut window = if config.preview {
        Some(WindowPreview::open(WINDOW_NAME)?)
    } else {
        None
    };

    let options = BlurOptions {
        output_size: writer.frame_size(),
        frame_skip: config.frame_skip,
        blur_sigma: config.blur_sigma,
        keep_records: config.report.is_some(),
    };

    tracing::info!(
        "Blurring faces: scale={}, frame_skip={}, sigma={}",
        config.scale,
        config.frame_skip.interval(),
        config.blur_sigma
    );

    let outcome = blur_video(
        &mut reader,
        &mut writer,
        detector,
        window.as_mut().map(|w| w as &mut dyn FramePreview),
        &options,
    )?;

    if let Some(path) = &config.report {
        let report = RunReport::new(config, outcome.summary.clone(), outcome.frames);
        write_report(path, &report)?;
        tracing::info!("Run report written to {}", path.display());
    }

    Ok(outcome.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::FaceBox;
    use crate::video::VideoProperties;
    use opencv::core::{Rect, Scalar, Vec3b, CV_8UC3};
    use opencv::prelude::*;

    /// Yields `remaining` 100x80 frames with a white block at (20,20)-(40,40)
    struct FakeReader {
        remaining: usize,
    }

    impl VideoReader for FakeReader {
        fn properties(&self) -> VideoProperties {
            VideoProperties {
                fourcc: 0,
                fps: 30.0,
                width: 100,
                height: 80,
                frame_count: self.remaining,
            }
        }

        fn next_frame(&mut self) -> Result<Option<Mat>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let mut frame = Mat::new_rows_cols_with_default(80, 100, CV_8UC3, Scalar::all(0.0))?;
            imgproc::rectangle(
                &mut frame,
                Rect::new(20, 20, 20, 20),
                Scalar::all(255.0),
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
            Ok(Some(frame))
        }
    }

    #[derive(Default)]
    struct VecSink {
        frames: Vec<Mat>,
    }

    impl FrameSink for VecSink {
        fn write(&mut self, frame: &Mat) -> Result<()> {
            self.frames.push(frame.try_clone()?);
            Ok(())
        }
    }

    struct FixedDetector {
        faces: Vec<FaceBox>,
        calls: usize,
    }

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _frame: &Mat) -> Result<Vec<FaceBox>> {
            self.calls += 1;
            Ok(self.faces.clone())
        }
    }

    struct QuitAfter {
        shown: usize,
        limit: usize,
    }

    impl FramePreview for QuitAfter {
        fn show(&mut self, _frame: &Mat) -> Result<bool> {
            self.shown += 1;
            Ok(self.shown >= self.limit)
        }
    }

    fn options(skip: usize) -> BlurOptions {
        BlurOptions {
            output_size: scaled_size(100, 80, 0.7),
            frame_skip: FrameSkip::new(skip).unwrap(),
            blur_sigma: 10.0,
            keep_records: true,
        }
    }

    #[test]
    fn test_frame_skip() {
        let skip = FrameSkip::new(4).unwrap();
        let processed: Vec<usize> = (0..10).filter(|i| skip.should_process(*i)).collect();
        assert_eq!(processed, vec![0, 4, 8]);

        let every = FrameSkip::new(1).unwrap();
        assert!((0..5).all(|i| every.should_process(i)));

        assert!(FrameSkip::new(0).is_err());
    }

    #[test]
    fn test_output_fps_preserves_duration() {
        let input_fps = 30.0;
        let input_frames = 120;
        for interval in [1, 2, 4, 5] {
            let skip = FrameSkip::new(interval).unwrap();
            let kept = (0..input_frames).filter(|i| skip.should_process(*i)).count();
            let input_secs = input_frames as f64 / input_fps;
            let output_secs = kept as f64 / skip.output_fps(input_fps);
            assert!(
                (input_secs - output_secs).abs() < 1e-9,
                "interval {}: {}s in, {}s out",
                interval,
                input_secs,
                output_secs
            );
        }
        assert_eq!(FrameSkip::new(4).unwrap().output_fps(30.0), 7.5);
    }

    #[test]
    fn test_records_only_kept_when_requested() {
        let mut reader = FakeReader { remaining: 8 };
        let mut sink = VecSink::default();
        let mut detector = FixedDetector {
            faces: vec![FaceBox::from_xywh(10.0, 10.0, 20.0, 20.0)],
            calls: 0,
        };
        let opts = BlurOptions {
            keep_records: false,
            ..options(4)
        };

        let outcome = blur_video(&mut reader, &mut sink, &mut detector, None, &opts).unwrap();
        assert!(outcome.frames.is_empty());
        assert_eq!(outcome.summary.frames_written, 2);
        assert_eq!(outcome.summary.faces_blurred, 2);
    }

    /// Write `frames` copies of `FakeReader`'s frame to an MJPG AVI at `fps`
    fn write_input_video(path: &std::path::Path, frames: usize, fps: f64) {
        let fourcc = opencv::videoio::VideoWriter::fourcc('M', 'J', 'P', 'G').unwrap();
        let mut writer = OpencvWriter::create(path, fourcc, fps, Size::new(100, 80)).unwrap();
        let mut source = FakeReader { remaining: frames };
        while let Some(frame) = source.next_frame().unwrap() {
            writer.write(&frame).unwrap();
        }
    }

    #[test]
    fn test_run_writes_video_and_report() {
        use clap::Parser;
        use std::ffi::OsString;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.avi");
        let output = dir.path().join("out").join("blurred.avi");
        let report = dir.path().join("report.json");
        write_input_video(&input, 8, 20.0);

        let argv: Vec<OsString> = vec![
            "faceblur".into(),
            "model.onnx".into(),
            input.clone().into(),
            "--output".into(),
            output.clone().into(),
            "--report".into(),
            report.clone().into(),
        ];
        let args = crate::cli::Args::try_parse_from(argv).unwrap();
        let config = FaceBlurConfig::from_args(&args).unwrap();
        let mut detector = FixedDetector {
            faces: vec![FaceBox::from_xywh(10.0, 10.0, 20.0, 20.0)],
            calls: 0,
        };

        let summary = run_with_detector(&config, &mut detector).unwrap();
        assert_eq!(summary.frames_read, 8);
        assert_eq!(summary.frames_written, 2);
        assert_eq!(summary.stop_reason, StopReason::EndOfStream);

        let mut written = OpencvReader::open(&output).unwrap();
        let props = written.properties();
        assert_eq!((props.width, props.height), (70, 56));
        assert!((props.fps - 5.0).abs() < 1e-3, "fps {}", props.fps);
        let mut count = 0;
        while written.next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(value["summary"]["frames_written"], 2);
        assert_eq!(value["frames"].as_array().unwrap().len(), 2);
        assert_eq!(value["frames"][1]["index"], 4);
    }

    #[test]
    fn test_blur_video_skips_and_resizes() {
        let mut reader = FakeReader { remaining: 10 };
        let mut sink = VecSink::default();
        let mut detector = FixedDetector {
            faces: vec![FaceBox::from_xywh(10.0, 10.0, 20.0, 20.0)],
            calls: 0,
        };

        let outcome = blur_video(&mut reader, &mut sink, &mut detector, None, &options(4)).unwrap();

        assert_eq!(detector.calls, 3);
        assert_eq!(sink.frames.len(), 3);
        for frame in &sink.frames {
            assert_eq!(frame.size().unwrap(), Size::new(70, 56));
        }

        let summary = &outcome.summary;
        assert_eq!(summary.frames_read, 10);
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.frames_written, 3);
        assert_eq!(summary.faces_detected, 3);
        assert_eq!(summary.faces_blurred, 3);
        assert_eq!(summary.stop_reason, StopReason::EndOfStream);

        let indices: Vec<usize> = outcome.frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 4, 8]);
    }

    #[test]
    fn test_blur_video_blurs_detected_region() {
        let mut reader = FakeReader { remaining: 1 };
        let mut sink = VecSink::default();
        // White block lands at (14,14)-(28,28) after the 0.7 downscale
        let mut detector = FixedDetector {
            faces: vec![FaceBox::from_xywh(5.0, 5.0, 35.0, 35.0)],
            calls: 0,
        };

        blur_video(&mut reader, &mut sink, &mut detector, None, &options(1)).unwrap();

        let frame = &sink.frames[0];
        let inside = frame.at_2d::<Vec3b>(8, 21).unwrap()[0];
        let outside = frame.at_2d::<Vec3b>(50, 60).unwrap()[0];
        assert!(inside > 0, "blur should spread the block into its surroundings");
        assert_eq!(outside, 0);
    }

    #[test]
    fn test_faces_outside_frame_are_counted_but_not_blurred() {
        let mut reader = FakeReader { remaining: 2 };
        let mut sink = VecSink::default();
        let mut detector = FixedDetector {
            faces: vec![FaceBox::from_xywh(500.0, 500.0, 20.0, 20.0)],
            calls: 0,
        };

        let outcome = blur_video(&mut reader, &mut sink, &mut detector, None, &options(1)).unwrap();
        assert_eq!(outcome.summary.faces_detected, 2);
        assert_eq!(outcome.summary.faces_blurred, 0);
        assert_eq!(outcome.summary.frames_written, 2);
    }

    #[test]
    fn test_preview_quit_stops_the_loop() {
        let mut reader = FakeReader { remaining: 20 };
        let mut sink = VecSink::default();
        let mut detector = FixedDetector {
            faces: Vec::new(),
            calls: 0,
        };
        let mut preview = QuitAfter { shown: 0, limit: 2 };

        let outcome = blur_video(
            &mut reader,
            &mut sink,
            &mut detector,
            Some(&mut preview),
            &options(4),
        )
        .unwrap();

        // Frames 0 and 4 are processed, the quit arrives while showing frame 4
        assert_eq!(outcome.summary.stop_reason, StopReason::UserQuit);
        assert_eq!(outcome.summary.frames_read, 5);
        assert_eq!(outcome.summary.frames_written, 2);
        assert_eq!(preview.shown, 2);
    }

    #[test]
    fn test_detector_error_aborts_run() {
        struct Failing;
        impl FaceDetector for Failing {
            fn detect(&mut self, _frame: &Mat) -> Result<Vec<FaceBox>> {
                anyhow::bail!("inference failed")
            }
        }

        let mut reader = FakeReader { remaining: 3 };
        let mut sink = VecSink::default();
        let result = blur_video(&mut reader, &mut sink, &mut Failing, None, &options(1));
        assert!(result.is_err());
        assert!(sink.frames.is_empty());
    }
}
