use serde::{Deserialize, Serialize};

/// Axis-aligned bounding region in image-pixel coordinates.
///
/// Edges are half-open in the usual raster sense: `right` and `bottom` sit
/// one past the last covered pixel, so `width = right - left`. Regions from
/// different passes are compared by geometric overlap only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a region from `(top, right, bottom, left)` order, the layout
    /// face-location APIs traditionally report.
    pub fn from_css(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self::new(left, top, right, bottom)
    }

    pub fn to_css(&self) -> (i32, i32, i32, i32) {
        (self.top, self.right, self.bottom, self.left)
    }

    /// Builds a region from floating point corners, rounding to the nearest pixel.
    pub fn from_corners_f64(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(
            x1.round() as i32,
            y1.round() as i32,
            x2.round() as i32,
            y2.round() as i32,
        )
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// True for zero-area or inverted regions. Trackers cannot start on these.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Clamps every edge into `[0, width] x [0, height]` while keeping
    /// `left <= right` and `top <= bottom`.
    pub fn clamped(&self, width: u32, height: u32) -> Region {
        let w = width as i32;
        let h = height as i32;
        let left = self.left.clamp(0, w);
        let top = self.top.clamp(0, h);
        Region {
            left,
            top,
            right: self.right.clamp(left, w),
            bottom: self.bottom.clamp(top, h),
        }
    }

    /// Multiplies every coordinate by `factor`, used to map detections on a
    /// resized frame back to full resolution.
    pub fn scaled(&self, factor: f64) -> Region {
        Region::from_corners_f64(
            self.left as f64 * factor,
            self.top as f64 * factor,
            self.right as f64 * factor,
            self.bottom as f64 * factor,
        )
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Region {
        Region::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    pub fn intersection_area(&self, other: &Region) -> i64 {
        let ix1 = self.left.max(other.left);
        let iy1 = self.top.max(other.top);
        let ix2 = self.right.min(other.right);
        let iy2 = self.bottom.min(other.bottom);
        (ix2 - ix1).max(0) as i64 * (iy2 - iy1).max(0) as i64
    }

    /// Intersection with `other` divided by this region's own area.
    ///
    /// Zero-area regions overlap nothing.
    pub fn overlap_ratio(&self, other: &Region) -> f64 {
        let area = self.area();
        if area == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f64 / area as f64
    }

    /// Corner points in `[top-left, bottom-left, bottom-right, top-right]` order.
    pub fn corners(&self) -> [(i32, i32); 4] {
        [
            (self.left, self.top),
            (self.left, self.bottom),
            (self.right, self.bottom),
            (self.right, self.top),
        ]
    }

    /// Mean x coordinate of the four corners.
    pub fn center_x(&self) -> f64 {
        self.corners().iter().map(|(x, _)| *x as f64).sum::<f64>() / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_css_round_trip() {
        let r = Region::from_css(10, 80, 60, 20);
        assert_eq!(r, Region::new(20, 10, 80, 60));
        assert_eq!(r.to_css(), (10, 80, 60, 20));
    }

    #[test]
    fn test_dimensions_and_area() {
        let r = Region::new(10, 20, 110, 70);
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 50);
        assert_eq!(r.area(), 5000);
    }

    #[rstest]
    #[case::zero_width(Region::new(5, 0, 5, 10), true)]
    #[case::zero_height(Region::new(0, 5, 10, 5), true)]
    #[case::inverted(Region::new(10, 10, 0, 0), true)]
    #[case::normal(Region::new(0, 0, 1, 1), false)]
    fn test_is_empty(#[case] r: Region, #[case] expected: bool) {
        assert_eq!(r.is_empty(), expected);
    }

    #[rstest]
    #[case::inside(Region::new(10, 10, 50, 50), Region::new(10, 10, 50, 50))]
    #[case::overflow_right_bottom(Region::new(80, 60, 140, 120), Region::new(80, 60, 100, 80))]
    #[case::negative_origin(Region::new(-20, -5, 30, 40), Region::new(0, 0, 30, 40))]
    #[case::fully_outside(Region::new(150, 150, 200, 200), Region::new(100, 80, 100, 80))]
    fn test_clamped(#[case] input: Region, #[case] expected: Region) {
        assert_eq!(input.clamped(100, 80), expected);
    }

    #[test]
    fn test_clamped_keeps_ordering_for_inverted_input() {
        let r = Region::new(50, 50, 10, 10).clamped(100, 100);
        assert!(r.left <= r.right);
        assert!(r.top <= r.bottom);
    }

    #[test]
    fn test_scaled() {
        let r = Region::new(10, 20, 30, 40).scaled(4.0);
        assert_eq!(r, Region::new(40, 80, 120, 160));
    }

    #[test]
    fn test_scaled_rounds_fractional_factor() {
        let r = Region::new(3, 3, 5, 5).scaled(1.5);
        assert_eq!(r, Region::new(5, 5, 8, 8));
    }

    #[test]
    fn test_intersection_area() {
        let a = Region::new(0, 0, 100, 100);
        let b = Region::new(50, 0, 150, 100);
        assert_eq!(a.intersection_area(&b), 5000);
        assert_eq!(a.intersection_area(&Region::new(200, 200, 300, 300)), 0);
    }

    #[test]
    fn test_overlap_ratio_uses_own_area() {
        let big = Region::new(0, 0, 100, 100);
        let small = Region::new(0, 0, 50, 50);
        assert_relative_eq!(big.overlap_ratio(&small), 0.25);
        assert_relative_eq!(small.overlap_ratio(&big), 1.0);
    }

    #[test]
    fn test_overlap_ratio_zero_area() {
        let degenerate = Region::new(10, 10, 10, 50);
        assert_relative_eq!(degenerate.overlap_ratio(&Region::new(0, 0, 100, 100)), 0.0);
    }

    #[test]
    fn test_corners_order() {
        let r = Region::new(1, 2, 3, 4);
        assert_eq!(r.corners(), [(1, 2), (1, 4), (3, 4), (3, 2)]);
    }

    #[test]
    fn test_center_x() {
        assert_relative_eq!(Region::new(0, 0, 100, 10).center_x(), 50.0);
        assert_relative_eq!(Region::new(0, 0, 0, 10).center_x(), 0.0);
    }
}
