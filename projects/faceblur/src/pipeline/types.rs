use serde::Serialize;
use std::time::Duration;

/// A detected face in pixel coordinates of the frame it was detected on
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl FaceBox {
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + w,
            bottom: y + h,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Faces found on one processed frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    /// Index of the frame in the input stream
    pub index: usize,
    pub faces: Vec<FaceBox>,
    /// Regions actually blurred after clamping to the frame
    pub blurred: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    UserQuit,
}

/// Counters for a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub frames_read: usize,
    pub frames_processed: usize,
    pub frames_written: usize,
    pub faces_detected: usize,
    pub faces_blurred: usize,
    pub stop_reason: StopReason,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
