use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture device error: {0}")]
    Device(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("source is closed")]
    Closed,
}

/// A live or recorded stream of frames.
///
/// `current_frame` returns the most recent decodable frame. Sources never
/// block on pipeline pacing: callers pull whenever they are ready to
/// process, and anything captured in between is simply superseded.
pub trait FrameSource: Send {
    fn current_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the underlying device or file. Further reads fail with
    /// [`CaptureError::Closed`].
    fn close(&mut self);
}
