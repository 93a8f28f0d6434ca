use std::time::Instant;

use crate::aggregation::domain::identity_voter::IdentityVoter;
use crate::capture::domain::frame_source::FrameSource;
use crate::pipeline::pipeline_logger::{elapsed_ms, stage, NullPipelineLogger, PipelineLogger};
use crate::pipeline::tick_status::{read_frame, TickStatus};
use crate::recognition::domain::analysis::Analysis;
use crate::recognition::domain::face_record::FaceRecord;
use crate::recognition::domain::identity_matcher::IdentityMatcher;
use crate::shared::config::{ConfigError, PipelineConfig};
use crate::shared::frame::Frame;

/// Names the faces of a live stream and smooths the verdicts over time.
///
/// One frame in `process_every` is analysed on a resized copy; its regions
/// are mapped back to full resolution and the snapshot is fed to the
/// [`IdentityVoter`]. The latest frame and analysis are kept for display.
pub struct RecognitionStreamProcessor {
    source: Box<dyn FrameSource>,
    matcher: IdentityMatcher,
    voter: IdentityVoter,
    resize_factor: f64,
    process_every: usize,
    frame_count: usize,
    current_frame: Option<Frame>,
    current_analysis: Vec<Analysis>,
    logger: Box<dyn PipelineLogger>,
}

impl RecognitionStreamProcessor {
    pub fn new(
        source: Box<dyn FrameSource>,
        matcher: IdentityMatcher,
        config: &PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            matcher,
            voter: IdentityVoter::new(config.window, config.latch_threshold, config.vote_scoring)?,
            resize_factor: config.resize_factor,
            process_every: config.process_every,
            frame_count: 0,
            current_frame: None,
            current_analysis: Vec::new(),
            logger: Box::new(NullPipelineLogger),
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Reads one frame and, on analysis frames, matches it against
    /// `records`. A failing detector or encoder counts as a frame without
    /// faces.
    pub fn tick(&mut self, records: &[FaceRecord]) -> TickStatus {
        let t0 = Instant::now();
        let frame = match read_frame(self.source.as_mut()) {
            Ok(frame) => frame,
            Err(status) => return status,
        };
        self.logger.timing(stage::CAPTURE, elapsed_ms(t0));

        if self.frame_count % self.process_every == 0 {
            let t0 = Instant::now();
            self.current_analysis = self.analyse(&frame, records);
            self.logger.timing(stage::ANALYSE, elapsed_ms(t0));
            self.voter.push(self.current_analysis.clone());
            self.logger
                .metric("regions", self.current_analysis.len() as f64);
        }
        self.frame_count += 1;
        self.logger.tick(frame.index());
        self.current_frame = Some(frame);
        TickStatus::Processed
    }

    fn analyse(&mut self, frame: &Frame, records: &[FaceRecord]) -> Vec<Analysis> {
        let small = frame.resized(self.resize_factor);
        match self.matcher.analyze_frame(&small, records) {
            Ok(analysis) => analysis
                .iter()
                .map(|a| {
                    let mut full = a.scaled(self.resize_factor);
                    full.region = full.region.clamped(frame.width(), frame.height());
                    full
                })
                .collect(),
            Err(e) => {
                log::warn!("analysis failed on frame {}: {e}", frame.index());
                Vec::new()
            }
        }
    }

    /// Verdicts of the last analysed frame, regions at full resolution.
    pub fn current_analysis(&self) -> &[Analysis] {
        &self.current_analysis
    }

    /// Last frame read, analysed or not.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame.as_ref()
    }

    /// Latched identity, if any.
    pub fn current_name(&self) -> Option<&str> {
        self.voter.current()
    }

    pub fn reset_name(&mut self) {
        self.voter.reset();
    }

    pub fn voter(&self) -> &IdentityVoter {
        &self.voter
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn close(&mut self) {
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::replay_frame_source::ReplayFrameSource;
    use crate::detection::domain::region_detector::RegionDetector;
    use crate::recognition::domain::face_encoder::FaceEncoder;
    use crate::recognition::domain::face_encoding::FaceEncoding;
    use crate::shared::region::Region;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeDetector {
        regions: Vec<Region>,
        seen_widths: Arc<AtomicUsize>,
    }

    impl RegionDetector for FakeDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            self.seen_widths.store(frame.width() as usize, Ordering::SeqCst);
            Ok(self.regions.clone())
        }
    }

    struct FailingDetector;

    impl RegionDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Err("model crashed".into())
        }
    }

    /// Encodes each region as its left edge scaled down.
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

    fn frames(count: usize) -> Vec<Option<Frame>> {
        (0..count)
            .map(|i| Some(Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, i)))
            .collect()
    }

    fn record(name: &str, x: f32) -> FaceRecord {
        FaceRecord {
            encoding: FaceEncoding::new(vec![x, 0.0]),
            name: name.to_string(),
            image_path: PathBuf::from(format!("{name}.jpg")),
            profile: String::new(),
        }
    }

    fn processor(
        script: Vec<Option<Frame>>,
        detector: Box<dyn RegionDetector>,
        process_every: usize,
    ) -> RecognitionStreamProcessor {
        let config = PipelineConfig {
            resize_factor: 2.0,
            process_every,
            ..PipelineConfig::default()
        };
        let matcher = IdentityMatcher::new(detector, Box::new(FakeEncoder), 0.6).unwrap();
        RecognitionStreamProcessor::new(Box::new(ReplayFrameSource::new(script)), matcher, &config)
            .unwrap()
    }

    fn face_at(left: i32) -> (Box<dyn RegionDetector>, Arc<AtomicUsize>) {
        let seen = Arc::new(AtomicUsize::new(0));
        let detector = FakeDetector {
            regions: vec![Region::new(left, 10, left + 20, 30)],
            seen_widths: Arc::clone(&seen),
        };
        (Box::new(detector), seen)
    }

    #[test]
    fn test_analyses_resized_frame_and_scales_regions_back() {
        let (detector, seen) = face_at(20);
        let mut p = processor(frames(1), detector, 1);

        p.tick(&[record("A", 0.2)]);

        assert_eq!(seen.load(Ordering::SeqCst), 50);
        let analysis = p.current_analysis();
        assert_eq!(analysis.len(), 1);
        assert_eq!(analysis[0].name.as_deref(), Some("A"));
        assert_eq!(analysis[0].region, Region::new(40, 20, 80, 60));
        assert_eq!(p.current_frame().map(Frame::index), Some(0));
    }

    #[test]
    fn test_name_latches_after_consistent_frames() {
        let (detector, _) = face_at(20);
        let mut p = processor(frames(3), detector, 1);
        let records = [record("A", 0.2), record("B", 0.9)];

        p.tick(&records);
        p.tick(&records);
        assert_eq!(p.current_name(), None);
        p.tick(&records);
        assert_eq!(p.current_name(), Some("A"));

        p.reset_name();
        assert_eq!(p.current_name(), None);
    }

    #[test]
    fn test_unknown_face_never_latches() {
        let (detector, _) = face_at(20);
        let mut p = processor(frames(5), detector, 1);

        for _ in 0..5 {
            p.tick(&[record("Far", 5.0)]);
        }
        assert_eq!(p.current_name(), None);
        assert_eq!(p.current_analysis()[0].display_name(), "Unknown");
    }

    #[test]
    fn test_only_every_nth_frame_is_analysed() {
        let (detector, _) = face_at(20);
        let mut p = processor(frames(4), detector, 2);

        for _ in 0..4 {
            p.tick(&[record("A", 0.2)]);
        }
        assert_eq!(p.voter().len(), 2);
        assert_eq!(p.current_frame().map(Frame::index), Some(3));
    }

    #[test]
    fn test_detector_failure_counts_as_empty_frame() {
        let mut p = processor(frames(2), Box::new(FailingDetector), 1);

        assert_eq!(p.tick(&[]), TickStatus::Processed);
        assert!(p.current_analysis().is_empty());
        assert_eq!(p.voter().len(), 1);
    }

    #[test]
    fn test_end_of_stream_is_reported() {
        let (detector, _) = face_at(20);
        let mut p = processor(vec![], detector, 1);
        assert_eq!(p.tick(&[]), TickStatus::Ended);
        assert!(p.current_frame().is_none());
    }
}
