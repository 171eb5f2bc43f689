use super::{VideoProperties, VideoReader};
use anyhow::{anyhow, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{
        VideoCapture, CAP_ANY, CAP_PROP_FOURCC, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT,
        CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH,
    },
};
use std::path::Path;

const FALLBACK_FPS: f64 = 30.0;

pub struct OpencvReader {
    capture: VideoCapture,
    properties: VideoProperties,
}

impl OpencvReader {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Video path is not valid UTF-8: {:?}", path))?;

        let capture = VideoCapture::from_file(path_str, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open video file: {}", path_str));
        }

        let fps = sanitize_fps(capture.get(CAP_PROP_FPS)?);

        let raw_count = capture.get(CAP_PROP_FRAME_COUNT)?;
        let properties = VideoProperties {
            fourcc: capture.get(CAP_PROP_FOURCC)? as i32,
            fps,
            width: capture.get(CAP_PROP_FRAME_WIDTH)? as i32,
            height: capture.get(CAP_PROP_FRAME_HEIGHT)? as i32,
            frame_count: if raw_count > 0.0 { raw_count as usize } else { 0 },
        };

        tracing::info!(
            "OpencvReader: opened {}, {}x{}, fps={:.2}, stream_frames={}, fourcc={}",
            path_str,
            properties.width,
            properties.height,
            properties.fps,
            properties.frame_count,
            fourcc_to_string(properties.fourcc)
        );

        Ok(Self {
            capture,
            properties,
        })
    }
}

impl VideoReader for OpencvReader {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }

        Ok(Some(frame))
    }
}

/// Containers that report no usable frame rate are treated as 30 fps.
pub fn sanitize_fps(fps: f64) -> f64 {
    if fps <= 0.0 || !fps.is_finite() {
        tracing::warn!(
            "OpencvReader: Failed to get FPS from metadata, falling back to {:.1}",
            FALLBACK_FPS
        );
        return FALLBACK_FPS;
    }
    fps
}

/// Render a FOURCC tag as its four characters, e.g. `avc1`.
pub fn fourcc_to_string(fourcc: i32) -> String {
    if fourcc == 0 {
        return "unknown".to_string();
    }
    (0..4)
        .map(|i| ((fourcc >> (8 * i)) & 0xff) as u8)
        .map(|b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_to_string() {
        let avc1 = i32::from_le_bytes(*b"avc1");
        assert_eq!(fourcc_to_string(avc1), "avc1");
        assert_eq!(fourcc_to_string(0), "unknown");
    }

    #[test]
    fn test_sanitize_fps() {
        assert_eq!(sanitize_fps(25.0), 25.0);
        assert_eq!(sanitize_fps(29.97), 29.97);
        assert_eq!(sanitize_fps(0.0), FALLBACK_FPS);
        assert_eq!(sanitize_fps(-1.0), FALLBACK_FPS);
        assert_eq!(sanitize_fps(f64::NAN), FALLBACK_FPS);
        assert_eq!(sanitize_fps(f64::INFINITY), FALLBACK_FPS);
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(OpencvReader::open(Path::new("/nonexistent/input.mp4")).is_err());
    }
}
