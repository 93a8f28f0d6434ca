pub mod correlation_tracker;
