pub mod opencv_reader;
pub mod opencv_writer;
pub mod processor;

use anyhow::Result;
use opencv::core::Mat;

/// Stream metadata read once when the input is opened
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    /// Codec FOURCC tag as reported by the container (0 if unknown)
    pub fourcc: i32,
    pub fps: f64,
    pub width: i32,
    pub height: i32,
    /// Container's frame count estimate, 0 when unknown
    pub frame_count: usize,
}

pub trait VideoReader {
    fn properties(&self) -> VideoProperties;
    /// Next decoded frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Mat>>;
}

/// Destination for processed frames.
pub trait FrameSink {
    fn write(&mut self, frame: &Mat) -> Result<()>;
}
