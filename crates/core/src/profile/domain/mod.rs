pub mod description;
pub mod profile_classifier;
