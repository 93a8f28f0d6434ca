use crate::shared::region::Region;

/// Pull-based access to the regions a stream processor publishes.
///
/// Each call to `current_locations` runs one full analysis cycle on the
/// newest frame, so callers set the pace.
pub trait LocationSource: Send {
    fn current_locations(&mut self) -> Vec<Region>;

    /// `(width, height)` of the last successfully read frame, `(0, 0)`
    /// before the first one.
    fn current_image_size(&self) -> (u32, u32);
}
