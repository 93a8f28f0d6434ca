use crate::recognition::domain::identity_matcher::{IdentityMatcher, SingleFace};
use crate::recognition::infrastructure::face_database::{EnrollStatus, FaceDatabase};
use crate::shared::frame::Frame;

/// Enrollment: detect → require exactly one face → encode → store.
pub struct EnrollFaceUseCase {
    matcher: IdentityMatcher,
}

impl EnrollFaceUseCase {
    pub fn new(matcher: IdentityMatcher) -> Self {
        Self { matcher }
    }

    /// Adds `image` to `database` under `name`.
    ///
    /// Zero or several faces and, with `check_name`, an existing name are
    /// reported through the returned status and leave the database as is.
    pub fn execute(
        &mut self,
        database: &mut FaceDatabase,
        image: &Frame,
        name: &str,
        file_name: &str,
        check_name: bool,
    ) -> Result<EnrollStatus, Box<dyn std::error::Error>> {
        let face = self.matcher.single_face(image)?;
        if let SingleFace::Ambiguous(count) = face {
            log::info!("Not enrolling {name}: expected one face, found {count}");
        }
        Ok(database.add(image, face, name, file_name, check_name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::region_detector::RegionDetector;
    use crate::recognition::domain::face_encoder::FaceEncoder;
    use crate::recognition::domain::face_encoding::FaceEncoding;
    use crate::shared::region::Region;
    use rstest::rstest;
    use tempfile::TempDir;

    struct FakeDetector {
        faces: usize,
    }

    impl RegionDetector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Ok((0..self.faces as i32)
                .map(|i| Region::new(i * 20, 0, i * 20 + 10, 10))
                .collect())
        }
    }

    struct FakeEncoder;

    impl FaceEncoder for FakeEncoder {
        fn encode(
            &mut self,
            _frame: &Frame,
            regions: &[Region],
        ) -> Result<Vec<FaceEncoding>, Box<dyn std::error::Error>> {
            Ok(regions.iter().map(|_| FaceEncoding::new(vec![1.0, 0.0])).collect())
        }
    }

    fn use_case(faces: usize) -> EnrollFaceUseCase {
        EnrollFaceUseCase::new(
            IdentityMatcher::new(Box::new(FakeDetector { faces }), Box::new(FakeEncoder), 0.6)
                .unwrap(),
        )
    }

    fn image() -> Frame {
        Frame::new(vec![128u8; 64 * 32 * 3], 64, 32, 3, 0)
    }

    #[test]
    fn test_single_face_is_enrolled() {
        let tmp = TempDir::new().unwrap();
        let mut db = FaceDatabase::open(tmp.path()).unwrap();

        let status = use_case(1).execute(&mut db, &image(), "ada", "ada_1", true).unwrap();

        assert!(status.added());
        assert_eq!(db.names(), vec!["ada".to_string()]);
        assert_eq!(db.encoding_for("ada"), Some(&FaceEncoding::new(vec![1.0, 0.0])));
        assert!(tmp.path().join("images/ada/ada_1.jpg").exists());
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    fn test_ambiguous_image_is_not_enrolled(#[case] faces: usize) {
        let tmp = TempDir::new().unwrap();
        let mut db = FaceDatabase::open(tmp.path()).unwrap();

        let status = use_case(faces).execute(&mut db, &image(), "ada", "ada_1", true).unwrap();

        assert!(!status.one_face_detected);
        assert!(db.is_empty());
    }

    #[test]
    fn test_existing_name_is_rejected_when_checked() {
        let tmp = TempDir::new().unwrap();
        let mut db = FaceDatabase::open(tmp.path()).unwrap();
        let mut uc = use_case(1);
        uc.execute(&mut db, &image(), "ada", "ada_1", true).unwrap();

        let again = uc.execute(&mut db, &image(), "ada", "ada_2", true).unwrap();
        let unchecked = uc.execute(&mut db, &image(), "ada", "ada_3", false).unwrap();

        assert!(again.name_already_exists);
        assert!(unchecked.added());
        assert_eq!(db.len(), 2);
    }
}
