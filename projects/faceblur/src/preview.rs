use anyhow::Result;
use opencv::core::Mat;
use opencv::highgui;

pub const WINDOW_NAME: &str = "Output frame";

/// How long to wait for a key after showing a frame
const KEY_WAIT_MS: i32 = 30;

/// Something that displays output frames and can ask the loop to stop.
pub trait FramePreview {
    /// Show `frame`; returns `true` when the user asked to quit.
    fn show(&mut self, frame: &Mat) -> Result<bool>;
}

/// HighGUI window; any key press requests quit.
pub struct WindowPreview {
    name: String,
}

impl WindowPreview {
    pub fn open(name: &str) -> Result<Self> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            name: name.to_string(),
        })
    }
}

impl FramePreview for WindowPreview {
    fn show(&mut self, frame: &Mat) -> Result<bool> {
        highgui::imshow(&self.name, frame)?;
        let key = highgui::wait_key(KEY_WAIT_MS)?;
        if key >= 0 {
            tracing::info!("Key {} pressed, stopping", key);
            return Ok(true);
        }
        Ok(false)
    }
}

impl Drop for WindowPreview {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.name);
    }
}
