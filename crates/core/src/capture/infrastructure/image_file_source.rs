use std::path::Path;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Serves one still image as an endless stream.
///
/// Useful for enrollment from photos and for exercising the pipeline
/// without a camera.
pub struct ImageFileSource {
    frame: Option<Frame>,
    next_index: usize,
}

impl ImageFileSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        Ok(Self {
            frame: Some(read_image(path)?),
            next_index: 0,
        })
    }
}

/// Decodes one image file into an RGB frame with index 0.
pub fn read_image(path: &Path) -> Result<Frame, CaptureError> {
    let img = image::open(path)
        .map_err(|e| CaptureError::Decode(format!("{}: {e}", path.display())))?
        .to_rgb8();
    Ok(Frame::from_rgb_image(img, 0))
}

/// Whether `path` has one of the supported image extensions.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

impl FrameSource for ImageFileSource {
    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        let frame = self.frame.as_ref().ok_or(CaptureError::Closed)?;
        let out = frame.clone().with_index(self.next_index);
        self.next_index += 1;
        Ok(out)
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
