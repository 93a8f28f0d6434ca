use std::collections::VecDeque;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

/// Replays a scripted sequence of captures.
///
/// `None` entries stand for dropped frames. Once the script is exhausted
/// the source reports end of stream, or starts over when looping.
pub struct ReplayFrameSource {
    script: Vec<Option<Frame>>,
    pending: VecDeque<Option<Frame>>,
    looping: bool,
    closed: bool,
}

impl ReplayFrameSource {
    pub fn new(script: Vec<Option<Frame>>) -> Self {
        Self {
            pending: script.iter().cloned().collect(),
            script,
            looping: false,
            closed: false,
        }
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Convenience for a script without dropped frames.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self::new(frames.into_iter().map(Some).collect())
    }
}

impl FrameSource for ReplayFrameSource {
    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.closed {
            return Err(CaptureError::Closed);
        }
        if self.pending.is_empty() && self.looping {
            self.pending = self.script.iter().cloned().collect();
        }
        match self.pending.pop_front() {
            Some(Some(frame)) => Ok(frame),
            Some(None) => Err(CaptureError::Decode("dropped frame".into())),
            None => Err(CaptureError::EndOfStream),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}
