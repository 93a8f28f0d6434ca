use crate::recognition::domain::face_record::FaceRecord;
use crate::recognition::domain::identity_matcher::{closest_names, IdentityMatcher, SingleFace};
use crate::recognition::infrastructure::face_database::DatabaseError;
use crate::shared::frame::Frame;

/// Look-alike search for the single face of a photo.
pub struct SimilarFacesUseCase {
    matcher: IdentityMatcher,
}

impl SimilarFacesUseCase {
    pub fn new(matcher: IdentityMatcher) -> Self {
        Self { matcher }
    }

    /// Up to `n` distinct known names closest to the face in `image`,
    /// nearest first. Fails with [`DatabaseError::AmbiguousFace`] unless the
    /// image holds exactly one face.
    pub fn execute(
        &mut self,
        image: &Frame,
        records: &[FaceRecord],
        n: usize,
    ) -> Result<Vec<(String, f64)>, Box<dyn std::error::Error>> {
        match self.matcher.single_face(image)? {
            SingleFace::Found(encoding) => Ok(closest_names(&encoding, records, n)),
            SingleFace::Ambiguous(count) => Err(DatabaseError::AmbiguousFace(count).into()),
        }
    }
}
