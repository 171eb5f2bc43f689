use crate::pipeline::types::FaceBox;
use opencv::core::{Rect, Size};

/// Output frame size for a source of `width` x `height` downscaled by `scale`.
/// Both sides round up so a non-empty source never yields a zero dimension.
pub fn scaled_size(width: i32, height: i32, scale: f64) -> Size {
    Size::new(
        (scale * width as f64).ceil() as i32,
        (scale * height as f64).ceil() as i32,
    )
}

/// Pixel rectangle spanning the box corners, clamped to a frame of `bounds`.
/// Returns `None` when nothing of the box lies inside the frame.
pub fn face_rect(face: &FaceBox, bounds: Size) -> Option<Rect> {
    let x1 = (face.left.round() as i32).clamp(0, bounds.width);
    let y1 = (face.top.round() as i32).clamp(0, bounds.height);
    let x2 = (face.right.round() as i32).clamp(0, bounds.width);
    let y2 = (face.bottom.round() as i32).clamp(0, bounds.height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}
