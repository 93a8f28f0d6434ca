use std::time::Instant;

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::region_detector::RegionDetector;
use crate::detection::domain::suppression_filter::SuppressionFilter;
use crate::pipeline::location_source::LocationSource;
use crate::pipeline::pipeline_logger::{elapsed_ms, stage, NullPipelineLogger, PipelineLogger};
use crate::pipeline::scaled_detection::detect_at_scale;
use crate::pipeline::tick_status::{read_frame, TickStatus};
use crate::shared::config::{ConfigError, PipelineConfig};
use crate::shared::region::Region;

/// Stream processor without trackers: detects on one frame in
/// `process_every` and republishes the last result in between.
pub struct DetectorStreamProcessor {
    source: Box<dyn FrameSource>,
    detector: Box<dyn RegionDetector>,
    filter: SuppressionFilter,
    resize_factor: f64,
    process_every: usize,
    frame_count: usize,
    locations: Vec<Region>,
    image_size: (u32, u32),
    last_status: Option<TickStatus>,
    logger: Box<dyn PipelineLogger>,
}

impl DetectorStreamProcessor {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn RegionDetector>,
        config: &PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            detector,
            filter: SuppressionFilter::new(config.suppression_threshold),
            resize_factor: config.resize_factor,
            process_every: config.process_every,
            frame_count: 0,
            locations: Vec::new(),
            image_size: (0, 0),
            last_status: None,
            logger: Box::new(NullPipelineLogger),
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn tick(&mut self) -> TickStatus {
        let status = self.run_cycle();
        self.last_status = Some(status);
        status
    }

    /// Outcome of the most recent tick.
    pub fn last_status(&self) -> Option<TickStatus> {
        self.last_status
    }

    fn run_cycle(&mut self) -> TickStatus {
        let t0 = Instant::now();
        let frame = match read_frame(self.source.as_mut()) {
            Ok(frame) => frame,
            Err(status) => return status,
        };
        self.logger.timing(stage::CAPTURE, elapsed_ms(t0));
        self.image_size = frame.size();

        if self.frame_count % self.process_every == 0 {
            let t0 = Instant::now();
            let detections = detect_at_scale(self.detector.as_mut(), &frame, self.resize_factor);
            self.logger.timing(stage::DETECT, elapsed_ms(t0));

            let t0 = Instant::now();
            self.locations = self.filter.apply(&detections);
            self.logger.timing(stage::SUPPRESS, elapsed_ms(t0));
            log::debug!(
                "frame {}: {} detections, {} kept",
                frame.index(),
                detections.len(),
                self.locations.len()
            );
        }
        self.frame_count += 1;

        self.logger.metric("regions", self.locations.len() as f64);
        self.logger.tick(frame.index());
        TickStatus::Processed
    }

    pub fn locations(&self) -> &[Region] {
        &self.locations
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn close(&mut self) {
        self.source.close();
    }
}

impl LocationSource for DetectorStreamProcessor {
    fn current_locations(&mut self) -> Vec<Region> {
        self.tick();
        self.locations.clone()
    }

    fn current_image_size(&self) -> (u32, u32) {
        self.image_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::replay_frame_source::ReplayFrameSource;
    use crate::shared::frame::Frame;

    /// Returns a region whose left edge encodes the call number.
    struct CountingDetector {
        calls: usize,
    }

    impl RegionDetector for CountingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            self.calls += 1;
            let left = self.calls as i32;
            Ok(vec![Region::new(left, 0, left + 10, 10)])
        }
    }

    fn frames(count: usize) -> Vec<Option<Frame>> {
        (0..count)
            .map(|i| Some(Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, i)))
            .collect()
    }

    fn processor(script: Vec<Option<Frame>>, process_every: usize) -> DetectorStreamProcessor {
        let config = PipelineConfig {
            resize_factor: 1.0,
            process_every,
            ..PipelineConfig::default()
        };
        DetectorStreamProcessor::new(
            Box::new(ReplayFrameSource::new(script)),
            Box::new(CountingDetector { calls: 0 }),
            &config,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_process_every_fails_at_construction() {
        let config = PipelineConfig {
            process_every: 0,
            ..PipelineConfig::default()
        };
        let result = DetectorStreamProcessor::new(
            Box::new(ReplayFrameSource::new(vec![])),
            Box::new(CountingDetector { calls: 0 }),
            &config,
        );
        assert!(matches!(result, Err(ConfigError::ZeroProcessEvery)));
    }

    #[test]
    fn test_detects_every_frame_when_process_every_is_one() {
        let mut p = processor(frames(3), 1);
        let lefts: Vec<i32> = (0..3).map(|_| p.current_locations()[0].left).collect();
        assert_eq!(lefts, vec![1, 2, 3]);
    }

    #[test]
    fn test_reuses_locations_between_detections() {
        let mut p = processor(frames(5), 2);
        let lefts: Vec<i32> = (0..5).map(|_| p.current_locations()[0].left).collect();
        assert_eq!(lefts, vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn test_image_size_follows_every_read() {
        let script = vec![
            Some(Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, 0)),
            Some(Frame::new(vec![0u8; 40 * 30 * 3], 40, 30, 3, 1)),
        ];
        let mut p = processor(script, 5);
        assert_eq!(p.current_image_size(), (0, 0));
        p.tick();
        p.tick();
        assert_eq!(p.current_image_size(), (40, 30));
    }

    #[test]
    fn test_failed_read_keeps_locations() {
        let mut script = frames(1);
        script.push(None);
        let mut p = processor(script, 1);

        p.tick();
        assert_eq!(p.tick(), TickStatus::Skipped);
        assert_eq!(p.locations(), &[Region::new(1, 0, 11, 10)]);
    }
}
