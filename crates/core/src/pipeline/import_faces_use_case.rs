use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::infrastructure::image_file_source::{is_image, read_image};
use crate::recognition::domain::identity_matcher::IdentityMatcher;
use crate::recognition::infrastructure::face_database::{DatabaseError, FaceDatabase};

/// Outcome of a batch import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Batch enrollment from a folder tree: `<dir>/<name>/<photo>`.
///
/// Every photo holding exactly one face is copied into the database under
/// its folder's name. Other photos are skipped and left where they are.
pub struct ImportFacesUseCase {
    matcher: IdentityMatcher,
}

impl ImportFacesUseCase {
    pub fn new(matcher: IdentityMatcher) -> Self {
        Self { matcher }
    }

    pub fn execute(
        &mut self,
        database: &mut FaceDatabase,
        dir: &Path,
    ) -> Result<ImportSummary, Box<dyn std::error::Error>> {
        let mut summary = ImportSummary::default();
        for person_dir in sorted_entries(dir)?.into_iter().filter(|p| p.is_dir()) {
            let Some(name) = person_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            for photo in sorted_entries(&person_dir)?.into_iter().filter(|p| is_image(p)) {
                if self.import_photo(database, name, &photo)? {
                    summary.added += 1;
                } else {
                    summary.skipped += 1;
                }
            }
        }
        log::info!(
            "Imported {} face(s) from {}, skipped {}",
            summary.added,
            dir.display(),
            summary.skipped
        );
        Ok(summary)
    }

    fn import_photo(
        &mut self,
        database: &mut FaceDatabase,
        name: &str,
        photo: &Path,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let Some(file_name) = photo.file_stem().and_then(|s| s.to_str()) else {
            return Ok(false);
        };
        let image = match read_image(photo) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Skipping unreadable {}: {e}", photo.display());
                return Ok(false);
            }
        };
        let face = self.matcher.single_face(&image)?;
        match database.add(&image, face, name, file_name, false) {
            Ok(status) if status.added() => Ok(true),
            Ok(_) => {
                log::warn!("Skipping {}: not exactly one face", photo.display());
                Ok(false)
            }
            Err(DatabaseError::InvalidName(bad)) => {
                log::warn!("Skipping {}: invalid name {bad:?}", photo.display());
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::region_detector::RegionDetector;
    use crate::recognition::domain::face_encoder::FaceEncoder;
    use crate::recognition::domain::face_encoding::FaceEncoding;
    use crate::shared::frame::Frame;
    use crate::shared::region::Region;
    use tempfile::TempDir;

    /// Sees one face per 10 pixels of image width.
    struct WidthDetector;

    impl RegionDetector for WidthDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            let faces = (frame.width() / 10) as i32;
            Ok((0..faces).map(|i| Region::new(i * 10, 0, i * 10 + 5, 5)).collect())
        }
    }

    struct FakeEncoder;

    impl FaceEncoder for FakeEncoder {
        fn encode(
            &mut self,
            frame: &Frame,
            regions: &[Region],
        ) -> Result<Vec<FaceEncoding>, Box<dyn std::error::Error>> {
            Ok(regions
                .iter()
                .map(|_| FaceEncoding::new(vec![frame.height() as f32]))
                .collect())
        }
    }

    fn use_case() -> ImportFacesUseCase {
        ImportFacesUseCase::new(
            IdentityMatcher::new(Box::new(WidthDetector), Box::new(FakeEncoder), 0.6).unwrap(),
        )
    }

    fn write_photo(dir: &Path, person: &str, file: &str, width: u32) -> PathBuf {
        let folder = dir.join(person);
        fs::create_dir_all(&folder).unwrap();
        let path = folder.join(file);
        image::RgbImage::new(width, 8).save(&path).unwrap();
        path
    }

    #[test]
    fn test_imports_single_face_photos_per_person() {
        let source = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        write_photo(source.path(), "ada", "a1.png", 10);
        write_photo(source.path(), "ada", "a2.png", 12);
        write_photo(source.path(), "bob", "b1.png", 15);
        let mut db = FaceDatabase::open(store.path()).unwrap();

        let summary = use_case().execute(&mut db, source.path()).unwrap();

        assert_eq!(summary, ImportSummary { added: 3, skipped: 0 });
        assert_eq!(db.names(), vec!["ada".to_string(), "bob".to_string()]);
        assert!(store.path().join("images/ada/a2.jpg").exists());
    }

    #[test]
    fn test_same_stem_photos_keep_separate_images() {
        let source = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        write_photo(source.path(), "ada", "a.jpg", 10);
        write_photo(source.path(), "ada", "a.png", 12);
        let mut db = FaceDatabase::open(store.path()).unwrap();

        let summary = use_case().execute(&mut db, source.path()).unwrap();

        assert_eq!(summary, ImportSummary { added: 2, skipped: 0 });
        let paths: Vec<&Path> = db.records().iter().map(|r| r.image_path.as_path()).collect();
        assert_ne!(paths[0], paths[1]);
        assert!(paths.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_ambiguous_photos_are_skipped_not_deleted() {
        let source = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        let crowd = write_photo(source.path(), "ada", "crowd.png", 25);
        let empty = write_photo(source.path(), "ada", "empty.png", 5);
        write_photo(source.path(), "ada", "solo.png", 10);
        let mut db = FaceDatabase::open(store.path()).unwrap();

        let summary = use_case().execute(&mut db, source.path()).unwrap();

        assert_eq!(summary, ImportSummary { added: 1, skipped: 2 });
        assert!(crowd.exists());
        assert!(empty.exists());
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_non_images_and_loose_files_are_ignored() {
        let source = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        fs::write(source.path().join("readme.txt"), "hi").unwrap();
        fs::create_dir_all(source.path().join("ada")).unwrap();
        fs::write(source.path().join("ada/notes.txt"), "hi").unwrap();
        let mut db = FaceDatabase::open(store.path()).unwrap();

        let summary = use_case().execute(&mut db, source.path()).unwrap();

        assert_eq!(summary, ImportSummary::default());
        assert!(db.is_empty());
    }

    #[test]
    fn test_missing_directory_errors() {
        let store = TempDir::new().unwrap();
        let mut db = FaceDatabase::open(store.path()).unwrap();
        assert!(use_case()
            .execute(&mut db, Path::new("/nonexistent/people"))
            .is_err());
    }
}
