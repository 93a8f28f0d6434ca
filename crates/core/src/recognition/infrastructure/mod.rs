pub mod face_database;
pub mod onnx_face_encoder;
