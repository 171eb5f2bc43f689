use crate::video::VideoReader;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use opencv::core::Mat;
use std::time::{Duration, Instant};

/// What the frame loop should do after a frame has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct ProcessingStats {
    pub frames_read: usize,
    pub stopped_early: bool,
    pub duration: Duration,
}

/// A trait for handling video frames. This separates the "how to process"
/// from the "how to read and orchestrate" logic.
pub trait FrameProcessor {
    fn process(&mut self, index: usize, frame: Mat) -> Result<Flow>;
}

/// Blanket implementation so any closure with the right signature
/// automatically implements FrameProcessor.
impl<F> FrameProcessor for F
where
    F: FnMut(usize, Mat) -> Result<Flow>,
{
    fn process(&mut self, index: usize, frame: Mat) -> Result<Flow> {
        self(index, frame)
    }
}

fn progress_bar(total_frames: usize) -> Result<ProgressBar> {
    let pb = if total_frames > 0 {
        let pb = ProgressBar::new(total_frames as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1.yellow} fps, {eta})")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} frames ({per_sec:.1.yellow} fps)")?,
        );
        pb
    };
    Ok(pb)
}

/// Feed every frame of `reader` to `processor` until the stream ends
/// or the processor asks to stop.
pub fn process_video<P>(reader: &mut dyn VideoReader, mut processor: P) -> Result<ProcessingStats>
where
    P: FrameProcessor,
{
    let start_time = Instant::now();
    let pb = progress_bar(reader.properties().frame_count)?;

    let mut frames_read = 0;
    let mut stopped_early = false;

    while let Some(frame) = reader.next_frame()? {
        let index = frames_read;
        frames_read += 1;
        pb.inc(1);

        if processor.process(index, frame)? == Flow::Stop {
            stopped_early = true;
            break;
        }
    }

    if stopped_early {
        pb.abandon_with_message("Stopped");
    } else {
        pb.finish_with_message("Done");
    }

    Ok(ProcessingStats {
        frames_read,
        stopped_early,
        duration: start_time.elapsed(),
    })
}
