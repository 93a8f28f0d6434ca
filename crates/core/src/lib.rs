pub mod aggregation;
pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod profile;
pub mod recognition;
pub mod shared;
pub mod tracking;
