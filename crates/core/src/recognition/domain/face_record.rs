use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::recognition::domain::face_encoding::FaceEncoding;

/// One enrolled image. A person may own several records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub encoding: FaceEncoding,
    pub name: String,
    pub image_path: PathBuf,
    pub profile: String,
}
