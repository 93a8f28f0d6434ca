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
use crate::tracking::domain::region_tracker::TrackerFactory;
use crate::tracking::domain::tracker_pool::TrackerPool;

/// Detection plus tracking over a live stream.
///
/// Every tick advances the active trackers on the new frame. Full detection
/// runs on a resized copy of the frame whenever a tracker slot is free and
/// seeds the free slots; with every slot busy it is skipped, since a slot is
/// only reassigned once its tracker retires. The tracked regions are then
/// deduplicated and published together with the frame size.
pub struct TrackingStreamProcessor {
    source: Box<dyn FrameSource>,
    detector: Box<dyn RegionDetector>,
    pool: TrackerPool,
    filter: SuppressionFilter,
    resize_factor: f64,
    locations: Vec<Region>,
    image_size: (u32, u32),
    last_status: Option<TickStatus>,
    logger: Box<dyn PipelineLogger>,
}

impl TrackingStreamProcessor {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn RegionDetector>,
        tracker_factory: &TrackerFactory,
        config: &PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            detector,
            pool: TrackerPool::new(
                config.tracker_capacity,
                config.tracking_time,
                tracker_factory,
            )?,
            filter: SuppressionFilter::new(config.suppression_threshold),
            resize_factor: config.resize_factor,
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

    /// Runs one capture → track → detect → suppress → publish cycle.
    ///
    /// A failed or empty read leaves the published state untouched.
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

        let t0 = Instant::now();
        self.pool.advance_all(&frame);
        self.logger.timing(stage::TRACK, elapsed_ms(t0));

        if self.pool.has_vacancy() {
            let t0 = Instant::now();
            let detections = detect_at_scale(self.detector.as_mut(), &frame, self.resize_factor);
            let seeded = self.pool.seed_available(&frame, &detections);
            self.logger.timing(stage::DETECT, elapsed_ms(t0));
            log::debug!(
                "frame {}: {} detections, {seeded} trackers seeded",
                frame.index(),
                detections.len()
            );
        }

        let t0 = Instant::now();
        self.locations = self.filter.apply(&self.pool.active_regions());
        self.logger.timing(stage::SUPPRESS, elapsed_ms(t0));

        self.logger
            .metric("active_trackers", self.pool.active_count() as f64);
        self.logger.metric("regions", self.locations.len() as f64);
        self.logger.tick(frame.index());
        TickStatus::Processed
    }

    /// Published regions, without running a cycle.
    pub fn locations(&self) -> &[Region] {
        &self.locations
    }

    pub fn pool(&self) -> &TrackerPool {
        &self.pool
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn close(&mut self) {
        self.source.close();
    }
}

impl LocationSource for TrackingStreamProcessor {
    fn current_locations(&mut self) -> Vec<Region> {
        self.tick();
        self.locations.clone()
    }

    fn current_image_size(&self) -> (u32, u32) {
        self.image_size
    }
}
