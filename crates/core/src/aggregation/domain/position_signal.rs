use crate::pipeline::location_source::LocationSource;
use crate::shared::clock::Clock;
use crate::shared::region::Region;

/// Horizontal position of the first region mapped to `[-1, 1]`.
///
/// -1 is the left edge of the frame and +1 the right edge. No region (or
/// no known frame width) yields 0.
pub fn horizontal_position(regions: &[Region], frame_width: u32) -> f64 {
    match regions.first() {
        Some(region) if frame_width > 0 => {
            (2.0 * region.center_x() / frame_width as f64 - 1.0).clamp(-1.0, 1.0)
        }
        _ => 0.0,
    }
}

/// Produces the scalar the eye display follows.
pub trait PositionFinder: Send {
    fn current_position(&mut self) -> f64;
}

/// Follows the first region published by a stream processor.
pub struct StreamPositionFinder<S: LocationSource> {
    source: S,
}

impl<S: LocationSource> StreamPositionFinder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: LocationSource> PositionFinder for StreamPositionFinder<S> {
    fn current_position(&mut self) -> f64 {
        let regions = self.source.current_locations();
        let (width, _) = self.source.current_image_size();
        horizontal_position(&regions, width)
    }
}

/// Angular frequency of the demo signal, in radians per second.
pub const DEFAULT_OSCILLATION_FREQUENCY: f64 = 4.0;

/// Deterministic demo signal `cos(frequency * t)`, `t` read from `clock`.
pub struct OscillatingPositionFinder<C: Clock> {
    clock: C,
    frequency: f64,
}

impl<C: Clock> OscillatingPositionFinder<C> {
    pub fn new(clock: C) -> Self {
        Self::with_frequency(clock, DEFAULT_OSCILLATION_FREQUENCY)
    }

    pub fn with_frequency(clock: C, frequency: f64) -> Self {
        Self { clock, frequency }
    }
}

impl<C: Clock> PositionFinder for OscillatingPositionFinder<C> {
    fn current_position(&mut self) -> f64 {
        let t = self.clock.elapsed().as_secs_f64();
        (self.frequency * t).cos()
    }
}
