use crate::detection::domain::region_detector::{clamp_to_frame, RegionDetector};
use crate::shared::config::ConfigError;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Unions the output of several detectors, e.g. a pedestrian detector and
/// a face detector.
///
/// Results are concatenated in detector order without deduplication;
/// overlapping regions are left for the suppression filter.
pub struct CompositeDetector {
    detectors: Vec<Box<dyn RegionDetector>>,
}

impl CompositeDetector {
    pub fn new(detectors: Vec<Box<dyn RegionDetector>>) -> Result<Self, ConfigError> {
        if detectors.is_empty() {
            return Err(ConfigError::EmptyDetectorList);
        }
        Ok(Self { detectors })
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl RegionDetector for CompositeDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let mut regions = Vec::new();
        for detector in &mut self.detectors {
            regions.extend(clamp_to_frame(detector.detect(frame)?, frame));
        }
        Ok(regions)
    }
}
