pub mod composite_detector;
pub mod region_detector;
pub mod suppression_filter;
