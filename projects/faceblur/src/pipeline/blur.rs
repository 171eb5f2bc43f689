use crate::pipeline::geometry::face_rect;
use crate::pipeline::types::FaceBox;
use anyhow::Result;
use opencv::core::{Mat, Rect, Size};
use opencv::imgproc;
use opencv::prelude::*;

/// Gaussian-blur a single rectangle of `frame` in place.
/// The kernel size is derived from `sigma`.
pub fn blur_region(frame: &mut Mat, rect: Rect, sigma: f64) -> Result<()> {
    let source = Mat::roi(frame, rect)?.try_clone()?;
    let mut target = Mat::roi_mut(frame, rect)?;
    imgproc::gaussian_blur_def(&source, &mut *target, Size::new(0, 0), sigma)?;
    Ok(())
}

/// Blur every face region that overlaps the frame. Returns how many regions were blurred.
pub fn blur_faces(frame: &mut Mat, faces: &[FaceBox], sigma: f64) -> Result<usize> {
    let bounds = frame.size()?;
    let mut blurred = 0;

    for face in faces {
        match face_rect(face, bounds) {
            Some(rect) => {
                blur_region(frame, rect, sigma)?;
                blurred += 1;
            }
            None => tracing::trace!("Skipping face outside frame: {:?}", face),
        }
    }

    Ok(blurred)
}
