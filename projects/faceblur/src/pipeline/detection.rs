use crate::cli::DetectorChoice;
use crate::config::DetectorConfig;
use crate::pipeline::types::FaceBox;
use anyhow::{anyhow, bail, Context, Result};
use opencv::core::{Mat, Ptr, Rect, Size, Vector};
use opencv::objdetect::{CascadeClassifier, FaceDetectorYN};
use opencv::prelude::*;
use opencv::{dnn, imgproc};
use std::path::Path;

/// Columns per YuNet result row: box (4), five landmarks (10), score (1)
const YUNET_ROW_LEN: i32 = 15;
const YUNET_SCORE_COL: i32 = 14;

/// Where a compatible YuNet model can be downloaded.
pub const YUNET_MODEL_URL: &str =
    "https://github.com/opencv/opencv_zoo/tree/main/models/face_detection_yunet";

/// Anything that can find faces in a BGR frame.
pub trait FaceDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<FaceBox>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// OpenCV YuNet CNN over an ONNX model
    YuNet,
    /// OpenCV Haar/LBP cascade XML
    Cascade,
}

impl DetectorKind {
    /// Infer the backend from the model file extension.
    pub fn from_model_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "onnx" => Ok(Self::YuNet),
            "xml" => Ok(Self::Cascade),
            "dat" => bail!(
                "{} looks like a dlib model, which cannot be loaded here; \
                 use a YuNet .onnx model (download from {}) or an OpenCV cascade .xml",
                path.display(),
                YUNET_MODEL_URL
            ),
            _ => bail!(
                "Cannot infer detector type from {}; pass --detector yunet|haar",
                path.display()
            ),
        }
    }

    pub fn resolve(choice: DetectorChoice, path: &Path) -> Result<Self> {
        match choice {
            DetectorChoice::Auto => Self::from_model_path(path),
            DetectorChoice::Yunet => Ok(Self::YuNet),
            DetectorChoice::Haar => Ok(Self::Cascade),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::YuNet => "yunet",
            Self::Cascade => "haar",
        }
    }
}

/// Load the detector described by `config`. Any load failure is fatal to the run.
pub fn load_detector(config: &DetectorConfig) -> Result<Box<dyn FaceDetector>> {
    let path = &config.model_path;
    if !path.is_file() {
        bail!("Model file not found: {}", path.display());
    }

    let detector: Box<dyn FaceDetector> = match config.kind {
        DetectorKind::YuNet => Box::new(
            YuNetDetector::new(path, config)
                .with_context(|| format!("Failed to load YuNet model {}", path.display()))?,
        ),
        DetectorKind::Cascade => Box::new(
            CascadeDetector::new(path)
                .with_context(|| format!("Failed to load cascade {}", path.display()))?,
        ),
    };

    tracing::info!("Loaded {} detector from {}", config.kind.name(), path.display());
    Ok(detector)
}

/// Wrapper around OpenCV's `FaceDetectorYN`.
pub struct YuNetDetector {
    model: Ptr<FaceDetectorYN>,
    input_size: Size,
}

impl YuNetDetector {
    pub fn new(model_path: &Path, config: &DetectorConfig) -> Result<Self> {
        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("Model path is not valid UTF-8: {:?}", model_path))?;

        // Real input size is set per frame in `detect`
        let input_size = Size::new(320, 320);
        let model = FaceDetectorYN::create(
            path,
            "",
            input_size,
            config.score_threshold,
            config.nms_threshold,
            config.top_k,
            dnn::DNN_BACKEND_DEFAULT,
            dnn::DNN_TARGET_CPU,
        )?;

        Ok(Self { model, input_size })
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<FaceBox>> {
        if frame.empty() {
            return Ok(Vec::new());
        }

        let size = frame.size()?;
        if size != self.input_size {
            tracing::debug!("YuNet input size {}x{}", size.width, size.height);
            self.model.set_input_size(size)?;
            self.input_size = size;
        }

        let mut faces = Mat::default();
        self.model.detect(frame, &mut faces)?;
        parse_yunet_faces(&faces)
    }
}

/// Convert YuNet output rows `[x, y, w, h, landmarks.., score]` to face boxes.
fn parse_yunet_faces(faces: &Mat) -> Result<Vec<FaceBox>> {
    if faces.empty() || faces.rows() == 0 {
        return Ok(Vec::new());
    }
    if faces.cols() < YUNET_ROW_LEN {
        bail!(
            "Unexpected YuNet output: {} columns, expected {}",
            faces.cols(),
            YUNET_ROW_LEN
        );
    }

    let mut boxes = Vec::with_capacity(faces.rows() as usize);
    for row in 0..faces.rows() {
        let x = *faces.at_2d::<f32>(row, 0)?;
        let y = *faces.at_2d::<f32>(row, 1)?;
        let w = *faces.at_2d::<f32>(row, 2)?;
        let h = *faces.at_2d::<f32>(row, 3)?;
        let score = *faces.at_2d::<f32>(row, YUNET_SCORE_COL)?;
        boxes.push(FaceBox::from_xywh(x, y, w, h).with_confidence(score));
    }

    Ok(boxes)
}

/// Classic OpenCV cascade classifier, run on an equalized grayscale copy of the frame.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    min_size: Size,
}

impl CascadeDetector {
    pub fn new(model_path: &Path) -> Result<Self> {
        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("Model path is not valid UTF-8: {:?}", model_path))?;

        let classifier = CascadeClassifier::new(path)?;
        if classifier.empty()? {
            bail!("Cascade file {} contains no classifier", path);
        }

        Ok(Self {
            classifier,
            min_size: Size::new(30, 30),
        })
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<FaceBox>> {
        if frame.empty() {
            return Ok(Vec::new());
        }

        let mut gray = Mat::default();
        imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGR2GRAY)?;
        let mut equalized = Mat::default();
        imgproc::equalize_hist(&gray, &mut equalized)?;

        let mut rects = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &equalized,
            &mut rects,
            1.1,
            3,
            0,
            self.min_size,
            Size::new(0, 0),
        )?;

        Ok(rects
            .iter()
            .map(|r| FaceBox::from_xywh(r.x as f32, r.y as f32, r.width as f32, r.height as f32))
            .collect())
    }
}
