pub mod analysis;
pub mod face_encoder;
pub mod face_encoding;
pub mod face_record;
pub mod identity_matcher;
