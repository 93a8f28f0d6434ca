use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Finds regions of interest (people or faces) in a still frame.
///
/// Implementations must report regions clamped to the frame they were
/// given. They may keep state between calls, hence `&mut self`.
pub trait RegionDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}

/// Clamps every region to `frame` and drops the ones left without area.
pub fn clamp_to_frame(regions: impl IntoIterator<Item = Region>, frame: &Frame) -> Vec<Region> {
    let (w, h) = frame.size();
    regions
        .into_iter()
        .map(|r| r.clamped(w, h))
        .filter(|r| !r.is_empty())
        .collect()
}
