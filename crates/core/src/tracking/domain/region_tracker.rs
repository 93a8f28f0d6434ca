use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Single-object tracker that follows one region across frames.
///
/// Updates never fail: a tracker that loses its subject keeps reporting a
/// best guess until the pool retires it.
pub trait RegionTracker: Send {
    /// Starts following `region` in `frame`, discarding any previous state.
    fn start(&mut self, frame: &Frame, region: Region);

    /// Moves the tracked region to its best match in `frame`.
    fn update(&mut self, frame: &Frame);

    /// Current estimate, clamped to the last frame seen.
    fn position(&self) -> Region;
}

/// Builds fresh trackers for pool slots.
pub type TrackerFactory = Box<dyn Fn() -> Box<dyn RegionTracker> + Send>;
