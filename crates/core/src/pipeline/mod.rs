pub mod assign_profiles_use_case;
pub mod detector_stream_processor;
pub mod enroll_face_use_case;
pub mod import_faces_use_case;
pub mod infrastructure;
pub mod location_source;
pub mod pipeline_logger;
pub mod recognition_stream_processor;
pub(crate) mod scaled_detection;
pub mod shared_location_source;
pub mod similar_faces_use_case;
pub mod tick_status;
pub mod tracking_stream_processor;
