use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

/// What one stream processor tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// A frame was read and the published state refreshed.
    Processed,
    /// The frame could not be read; the previous state is still published.
    Skipped,
    /// The source is exhausted or closed; further ticks will be skipped too.
    Ended,
}

impl TickStatus {
    /// Logs a failed read and classifies it.
    pub(crate) fn from_capture_error(error: &CaptureError) -> Self {
        match error {
            CaptureError::EndOfStream | CaptureError::Closed => {
                log::debug!("frame source finished: {error}");
                TickStatus::Ended
            }
            _ => {
                log::warn!("dropped frame: {error}");
                TickStatus::Skipped
            }
        }
    }
}

/// Reads the next frame, turning read failures and empty frames into the
/// status the tick should report.
pub(crate) fn read_frame(source: &mut dyn FrameSource) -> Result<Frame, TickStatus> {
    match source.current_frame() {
        Ok(frame) if frame.is_empty() => {
            log::warn!("dropped empty frame {}", frame.index());
            Err(TickStatus::Skipped)
        }
        Ok(frame) => Ok(frame),
        Err(e) => Err(TickStatus::from_capture_error(&e)),
    }
}
