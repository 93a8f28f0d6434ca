use crate::detection::domain::region_detector::{clamp_to_frame, RegionDetector};
use crate::recognition::domain::analysis::Analysis;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::recognition::domain::face_encoding::FaceEncoding;
use crate::recognition::domain::face_record::FaceRecord;
use crate::shared::config::ConfigError;
use crate::shared::constants::MAX_DISTANCE;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Outcome of looking for exactly one face in a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum SingleFace {
    Found(FaceEncoding),
    /// Zero or several faces; carries how many were seen.
    Ambiguous(usize),
}

/// Names faces by nearest known encoding.
///
/// Any distance at or below `tolerance` is a match. Below-confidence faces
/// are reported as unknown, never as errors.
pub struct IdentityMatcher {
    detector: Box<dyn RegionDetector>,
    encoder: Box<dyn FaceEncoder>,
    tolerance: f64,
}

impl IdentityMatcher {
    pub fn new(
        detector: Box<dyn RegionDetector>,
        encoder: Box<dyn FaceEncoder>,
        tolerance: f64,
    ) -> Result<Self, ConfigError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        Ok(Self {
            detector,
            encoder,
            tolerance,
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Detects faces and encodes each of them, regions clamped to `frame`.
    pub fn encode_faces(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<(Region, FaceEncoding)>, Box<dyn std::error::Error>> {
        let regions = clamp_to_frame(self.detector.detect(frame)?, frame);
        if regions.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self.encoder.encode(frame, &regions)?;
        if encodings.len() != regions.len() {
            return Err(format!(
                "encoder returned {} encodings for {} faces",
                encodings.len(),
                regions.len()
            )
            .into());
        }
        Ok(regions.into_iter().zip(encodings).collect())
    }

    /// One verdict per detected face, in detection order.
    pub fn analyze_frame(
        &mut self,
        frame: &Frame,
        records: &[FaceRecord],
    ) -> Result<Vec<Analysis>, Box<dyn std::error::Error>> {
        let tolerance = self.tolerance;
        Ok(self
            .encode_faces(frame)?
            .into_iter()
            .map(|(region, encoding)| {
                let (name, distance) = best_match(&encoding, records, tolerance);
                Analysis {
                    name,
                    distance,
                    region,
                }
            })
            .collect())
    }

    /// Encoding of the only face in `frame`.
    pub fn single_face(&mut self, frame: &Frame) -> Result<SingleFace, Box<dyn std::error::Error>> {
        let mut faces = self.encode_faces(frame)?;
        if faces.len() != 1 {
            return Ok(SingleFace::Ambiguous(faces.len()));
        }
        let (_, encoding) = faces.remove(0);
        Ok(SingleFace::Found(encoding))
    }
}

/// Closest record's name if within `tolerance`, plus the minimum distance.
///
/// An empty record set yields [`MAX_DISTANCE`], which is never accepted
/// whatever the tolerance. Equal distances resolve to the first record.
pub fn best_match(
    encoding: &FaceEncoding,
    records: &[FaceRecord],
    tolerance: f64,
) -> (Option<String>, f64) {
    let closest = records
        .iter()
        .map(|r| (r, encoding.distance(&r.encoding)))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    match closest {
        None => (None, MAX_DISTANCE),
        Some((record, distance)) if distance <= tolerance => (Some(record.name.clone()), distance),
        Some((_, distance)) => (None, distance),
    }
}

/// Up to `n` distinct names sorted by their best distance to `encoding`.
pub fn closest_names(encoding: &FaceEncoding, records: &[FaceRecord], n: usize) -> Vec<(String, f64)> {
    let mut by_distance: Vec<(&str, f64)> = records
        .iter()
        .map(|r| (r.name.as_str(), encoding.distance(&r.encoding)))
        .collect();
    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let mut result: Vec<(String, f64)> = Vec::with_capacity(n);
    for (name, distance) in by_distance {
        if result.len() == n {
            break;
        }
        if result.iter().all(|(seen, _)| seen != name) {
            result.push((name.to_string(), distance));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::path::PathBuf;

    struct FakeDetector {
        regions: Vec<Region>,
    }

    impl RegionDetector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Ok(self.regions.clone())
        }
    }

    /// Encodes each region as its left edge scaled down, so tests can place
    /// faces at known points of the encoding space.
    struct FakeEncoder;

    impl FaceEncoder for FakeEncoder {
        fn encode(
            &mut self,
            _frame: &Frame,
            regions: &[Region],
        ) -> Result<Vec<FaceEncoding>, Box<dyn std::error::Error>> {
            Ok(regions
                .iter()
                .map(|r| FaceEncoding::new(vec![r.left as f32 / 100.0, 0.0]))
                .collect())
        }
    }

    fn matcher(regions: Vec<Region>) -> IdentityMatcher {
        IdentityMatcher::new(
            Box::new(FakeDetector { regions }),
            Box::new(FakeEncoder),
            0.6,
        )
        .unwrap()
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 200 * 100 * 3], 200, 100, 3, 0)
    }

    fn record(name: &str, x: f32) -> FaceRecord {
        FaceRecord {
            encoding: FaceEncoding::new(vec![x, 0.0]),
            name: name.to_string(),
            image_path: PathBuf::from(format!("{name}/{x}.jpg")),
            profile: String::new(),
        }
    }

    fn face_at(left: i32) -> Region {
        Region::new(left, 10, left + 20, 30)
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let result = IdentityMatcher::new(
            Box::new(FakeDetector { regions: vec![] }),
            Box::new(FakeEncoder),
            -0.1,
        );
        assert!(matches!(result, Err(ConfigError::InvalidTolerance(_))));
    }

    #[test]
    fn test_empty_database_is_unknown_at_max_distance() {
        let mut m = matcher(vec![face_at(0), face_at(50)]);
        let analysis = m.analyze_frame(&frame(), &[]).unwrap();
        assert_eq!(analysis.len(), 2);
        for a in &analysis {
            assert_eq!(a.name, None);
            assert_eq!(a.display_name(), "Unknown");
            assert_relative_eq!(a.distance, 1.0);
        }
    }

    #[test]
    fn test_match_within_tolerance() {
        let mut m = matcher(vec![face_at(50)]);
        let records = [record("ada", 0.4), record("bob", 1.5)];
        let analysis = m.analyze_frame(&frame(), &records).unwrap();
        assert_eq!(analysis[0].name.as_deref(), Some("ada"));
        assert_relative_eq!(analysis[0].distance, 0.1, epsilon = 1e-6);
        assert_eq!(analysis[0].region, face_at(50));
    }

    #[test]
    fn test_distance_exactly_at_tolerance_matches() {
        let records = [record("ada", 0.5)];
        let (name, distance) = best_match(&FaceEncoding::new(vec![0.0, 0.0]), &records, 0.5);
        assert_eq!(name.as_deref(), Some("ada"));
        assert_relative_eq!(distance, 0.5);
    }

    #[test]
    fn test_too_far_reports_true_distance() {
        let mut m = matcher(vec![face_at(0)]);
        let analysis = m.analyze_frame(&frame(), &[record("ada", 0.9)]).unwrap();
        assert_eq!(analysis[0].name, None);
        assert_relative_eq!(analysis[0].distance, 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_regions_are_clamped() {
        let mut m = matcher(vec![Region::new(190, 90, 230, 130)]);
        let analysis = m.analyze_frame(&frame(), &[]).unwrap();
        assert_eq!(analysis[0].region, Region::new(190, 90, 200, 100));
    }

    #[rstest]
    #[case(vec![], 0)]
    #[case(vec![face_at(0), face_at(50)], 2)]
    fn test_single_face_requires_exactly_one(#[case] regions: Vec<Region>, #[case] seen: usize) {
        let mut m = matcher(regions);
        assert_eq!(m.single_face(&frame()).unwrap(), SingleFace::Ambiguous(seen));
    }

    #[test]
    fn test_single_face_found() {
        let mut m = matcher(vec![face_at(30)]);
        assert_eq!(
            m.single_face(&frame()).unwrap(),
            SingleFace::Found(FaceEncoding::new(vec![0.3, 0.0]))
        );
    }
}
