pub mod region_tracker;
pub mod tracker_pool;
