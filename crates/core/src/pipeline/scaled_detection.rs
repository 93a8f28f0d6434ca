use crate::detection::domain::region_detector::{clamp_to_frame, RegionDetector};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Runs `detector` on `frame` resized by `resize_factor` and maps the
/// results back to full resolution, clamped to `frame`.
///
/// A failing detector is logged and treated as finding nothing.
pub(crate) fn detect_at_scale(
    detector: &mut dyn RegionDetector,
    frame: &Frame,
    resize_factor: f64,
) -> Vec<Region> {
    let small = frame.resized(resize_factor);
    let regions = match detector.detect(&small) {
        Ok(regions) => regions,
        Err(e) => {
            log::warn!("detection failed on frame {}: {e}", frame.index());
            return Vec::new();
        }
    };
    let scale_x = frame.width() as f64 / small.width() as f64;
    let scale_y = frame.height() as f64 / small.height() as f64;
    clamp_to_frame(
        clamp_to_frame(regions, &small)
            .into_iter()
            .map(|r| scale_region(r, scale_x, scale_y)),
        frame,
    )
}

fn scale_region(r: Region, sx: f64, sy: f64) -> Region {
    Region::from_corners_f64(
        r.left as f64 * sx,
        r.top as f64 * sy,
        r.right as f64 * sx,
        r.bottom as f64 * sy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDetector {
        result: Result<Vec<Region>, String>,
        seen_size: Option<(u32, u32)>,
    }

    impl RegionDetector for FixedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            self.seen_size = Some(frame.size());
            self.result.clone().map_err(|e| e.into())
        }
    }

    #[test]
    fn test_detects_on_resized_frame_and_scales_back() {
        let frame = Frame::new(vec![0u8; 200 * 100 * 3], 200, 100, 3, 0);
        let mut detector = FixedDetector {
            result: Ok(vec![Region::new(10, 5, 30, 25)]),
            seen_size: None,
        };

        let regions = detect_at_scale(&mut detector, &frame, 2.0);

        assert_eq!(detector.seen_size, Some((100, 50)));
        assert_eq!(regions, vec![Region::new(20, 10, 60, 50)]);
    }

    #[test]
    fn test_upsampled_overflow_is_clamped() {
        let frame = Frame::new(vec![0u8; 40 * 30 * 3], 40, 30, 3, 0);
        let mut detector = FixedDetector {
            result: Ok(vec![Region::new(60, 40, 100, 90)]),
            seen_size: None,
        };

        let regions = detect_at_scale(&mut detector, &frame, 0.5);

        assert_eq!(detector.seen_size, Some((80, 60)));
        assert_eq!(regions, vec![Region::new(30, 20, 40, 30)]);
    }

    #[test]
    fn test_detector_error_yields_nothing() {
        let frame = Frame::new(vec![0u8; 20 * 20 * 3], 20, 20, 3, 0);
        let mut detector = FixedDetector {
            result: Err("boom".into()),
            seen_size: None,
        };
        assert!(detect_at_scale(&mut detector, &frame, 2.0).is_empty());
    }
}
