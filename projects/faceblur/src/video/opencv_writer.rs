use super::opencv_reader::fourcc_to_string;
use super::FrameSink;
use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::VideoWriter,
};
use std::path::Path;

pub struct OpencvWriter {
    writer: VideoWriter,
    frame_size: Size,
}

impl OpencvWriter {
    /// Open `path` for writing colour frames of exactly `frame_size`.
    /// A zero `fourcc` (container did not report one) falls back to `mp4v`.
    pub fn create(path: &Path, fourcc: i32, fps: f64, frame_size: Size) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Output path is not valid UTF-8: {:?}", path))?;

        let fourcc = output_fourcc(fourcc)?;

        let writer = VideoWriter::new(path_str, fourcc, fps, frame_size, true)?;
        if !writer.is_opened()? {
            return Err(anyhow!(
                "Could not open the output video for write: {}",
                path_str
            ));
        }

        tracing::info!(
            "OpencvWriter: writing {} ({}x{} @ {:.2} fps, fourcc={})",
            path_str,
            frame_size.width,
            frame_size.height,
            fps,
            fourcc_to_string(fourcc)
        );

        Ok(Self { writer, frame_size })
    }

    pub fn frame_size(&self) -> Size {
        self.frame_size
    }
}

/// The input's codec tag, or `mp4v` when the container did not report one.
pub fn output_fourcc(input_fourcc: i32) -> Result<i32> {
    if input_fourcc == 0 {
        tracing::warn!("Input codec unknown, writing with mp4v");
        return Ok(VideoWriter::fourcc('m', 'p', '4', 'v')?);
    }
    Ok(input_fourcc)
}

impl FrameSink for OpencvWriter {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        // VideoWriter silently drops frames of the wrong size
        let size = frame.size()?;
        if size != self.frame_size {
            return Err(anyhow!(
                "Frame size {}x{} does not match output size {}x{}",
                size.width,
                size.height,
                self.frame_size.width,
                self.frame_size.height
            ));
        }
        self.writer.write(frame)?;
        Ok(())
    }
}

impl Drop for OpencvWriter {
    fn drop(&mut self) {
        if let Err(e) = self.writer.release() {
            tracing::warn!("Failed to finalize output video: {}", e);
        }
    }
}
