use crate::recognition::domain::face_encoding::FaceEncoding;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Computes one identity encoding per face region.
pub trait FaceEncoder: Send {
    /// Returns encodings in the same order as `regions`.
    fn encode(
        &mut self,
        frame: &Frame,
        regions: &[Region],
    ) -> Result<Vec<FaceEncoding>, Box<dyn std::error::Error>>;
}
