use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregation::domain::identity_voter::VoteScoring;
use crate::detection::domain::suppression_filter::DEFAULT_OVERLAP_THRESHOLD;
use crate::shared::constants::{
    DEFAULT_LATCH_THRESHOLD, DEFAULT_PROCESS_EVERY, DEFAULT_RESIZE_FACTOR,
    DEFAULT_TOLERANCE, DEFAULT_TRACKER_CAPACITY, DEFAULT_TRACKING_TIME, DEFAULT_WINDOW,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("resize factor must be a positive finite number, got {0}")]
    InvalidResizeFactor(f64),
    #[error("tracker capacity must be at least 1")]
    ZeroTrackerCapacity,
    #[error("tracking time must be at least 1 frame")]
    ZeroTrackingTime,
    #[error("process_every must be at least 1")]
    ZeroProcessEvery,
    #[error("aggregation window must hold at least 1 snapshot")]
    ZeroWindow,
    #[error("suppression threshold must lie in [0, 1], got {0}")]
    InvalidSuppressionThreshold(f64),
    #[error("tolerance must be a non-negative number, got {0}")]
    InvalidTolerance(f64),
    #[error("latch threshold must be positive, got {0}")]
    InvalidLatchThreshold(f64),
    #[error("at least one region detector is required")]
    EmptyDetectorList,
    #[error("invalid category configuration: {0}")]
    InvalidCategories(String),
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tuning knobs shared by the stream processors and the identity voter.
///
/// Missing JSON fields fall back to the defaults in
/// [`crate::shared::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracker_capacity: usize,
    pub tracking_time: usize,
    pub resize_factor: f64,
    pub process_every: usize,
    pub suppression_threshold: f64,
    pub tolerance: f64,
    pub window: usize,
    pub latch_threshold: f64,
    pub vote_scoring: VoteScoring,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracker_capacity: DEFAULT_TRACKER_CAPACITY,
            tracking_time: DEFAULT_TRACKING_TIME,
            resize_factor: DEFAULT_RESIZE_FACTOR,
            process_every: DEFAULT_PROCESS_EVERY,
            suppression_threshold: DEFAULT_OVERLAP_THRESHOLD,
            tolerance: DEFAULT_TOLERANCE,
            window: DEFAULT_WINDOW,
            latch_threshold: DEFAULT_LATCH_THRESHOLD,
            vote_scoring: VoteScoring::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_resize_factor(self.resize_factor)?;
        if self.tracker_capacity == 0 {
            return Err(ConfigError::ZeroTrackerCapacity);
        }
        if self.tracking_time == 0 {
            return Err(ConfigError::ZeroTrackingTime);
        }
        if self.process_every == 0 {
            return Err(ConfigError::ZeroProcessEvery);
        }
        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !(0.0..=1.0).contains(&self.suppression_threshold) {
            return Err(ConfigError::InvalidSuppressionThreshold(
                self.suppression_threshold,
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if !self.latch_threshold.is_finite() || self.latch_threshold <= 0.0 {
            return Err(ConfigError::InvalidLatchThreshold(self.latch_threshold));
        }
        Ok(())
    }
}

pub fn validate_resize_factor(factor: f64) -> Result<(), ConfigError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(ConfigError::InvalidResizeFactor(factor));
    }
    Ok(())
}
