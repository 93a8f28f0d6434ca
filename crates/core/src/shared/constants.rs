use crate::shared::model_resolver::ModelSpec;

pub const FACE_DETECTOR_MODEL: ModelSpec = ModelSpec {
    name: "yolo11n-pose_widerface.onnx",
    url: "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx",
};

pub const FACE_EMBEDDING_MODEL: ModelSpec = ModelSpec {
    name: "w600k_r50.onnx",
    url: "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx",
};

/// Size of the tracker pool.
pub const DEFAULT_TRACKER_CAPACITY: usize = 5;

/// Frames a tracker may run before it must be re-seeded from a detection.
pub const DEFAULT_TRACKING_TIME: usize = 100;

pub const DEFAULT_RESIZE_FACTOR: f64 = 2.0;

pub const DEFAULT_PROCESS_EVERY: usize = 2;

/// Maximum Euclidean distance at which a face counts as a match.
pub const DEFAULT_TOLERANCE: f64 = 0.6;

/// Snapshots kept by the identity voter.
pub const DEFAULT_WINDOW: usize = 10;

pub const DEFAULT_LATCH_THRESHOLD: f64 = 2.5;

/// Distance reported when there is nothing to compare against.
pub const MAX_DISTANCE: f64 = 1.0;

pub const UNKNOWN_NAME: &str = "Unknown";

pub const DEFAULT_PROFILE: &str = "No profile available";

/// Classifier verdict when no category scores above zero.
pub const UNMATCHED_PROFILE: &str = "Unable to match description with profile";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
