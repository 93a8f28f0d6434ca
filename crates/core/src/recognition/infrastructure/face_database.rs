use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recognition::domain::face_encoding::FaceEncoding;
use crate::recognition::domain::face_record::FaceRecord;
use crate::recognition::domain::identity_matcher::SingleFace;
use crate::shared::constants::DEFAULT_PROFILE;
use crate::shared::frame::Frame;

/// Index file inside the database root.
const INDEX_FILE: &str = "faces.json";
/// Folder holding one sub-folder of enrollment images per person.
const IMAGES_DIR: &str = "images";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("failed to read face database {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse face database {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to save image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame cannot be stored as an RGB image")]
    UnsupportedFrame,
    #[error("expected exactly one face, found {0}")]
    AmbiguousFace(usize),
    #[error("{0:?} is not a valid file or folder name")]
    InvalidName(String),
}

/// Result of an enrollment attempt. The database changed iff
/// [`EnrollStatus::added`] is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrollStatus {
    pub name_already_exists: bool,
    pub one_face_detected: bool,
}

impl EnrollStatus {
    pub fn added(&self) -> bool {
        self.one_face_detected && !self.name_already_exists
    }
}

#[derive(Serialize, Deserialize, Default)]
struct IndexFile {
    records: Vec<FaceRecord>,
}

/// Known faces persisted as a JSON index next to the enrollment images.
///
/// Layout under `root`:
///
/// ```text
/// faces.json
/// images/<name>/<file>.jpg
/// ```
///
/// The index is rewritten synchronously after every mutation.
pub struct FaceDatabase {
    root: PathBuf,
    records: Vec<FaceRecord>,
}

impl FaceDatabase {
    /// Opens the database at `root`, creating an empty one if needed.
    pub fn open(root: &Path) -> Result<Self, DatabaseError> {
        let images = root.join(IMAGES_DIR);
        fs::create_dir_all(&images).map_err(|e| DatabaseError::Write {
            path: images.clone(),
            source: e,
        })?;

        let index = root.join(INDEX_FILE);
        let records = if index.exists() {
            let json = fs::read_to_string(&index).map_err(|e| DatabaseError::Read {
                path: index.clone(),
                source: e,
            })?;
            serde_json::from_str::<IndexFile>(&json)
                .map_err(|e| DatabaseError::Parse {
                    path: index.clone(),
                    source: e,
                })?
                .records
        } else {
            Vec::new()
        };
        log::info!("Loaded {} faces from {}", records.len(), index.display());

        Ok(Self {
            root: root.to_path_buf(),
            records,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn records(&self) -> &[FaceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct enrolled names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Enrolls `image` as `images/<name>/<file_name>.jpg`, or
    /// `<file_name>_<n>.jpg` when that file is already taken.
    ///
    /// Nothing is stored unless `face` holds exactly one face. With
    /// `check_name`, the name must be new: creating its image folder
    /// doubles as the uniqueness check. Detection ambiguity and duplicate
    /// names are reported through the status, not as errors.
    pub fn add(
        &mut self,
        image: &Frame,
        face: SingleFace,
        name: &str,
        file_name: &str,
        check_name: bool,
    ) -> Result<EnrollStatus, DatabaseError> {
        validate_component(name)?;
        validate_component(file_name)?;

        let encoding = match face {
            SingleFace::Found(encoding) => encoding,
            SingleFace::Ambiguous(_) => {
                return Ok(EnrollStatus {
                    name_already_exists: false,
                    one_face_detected: false,
                })
            }
        };

        let folder = self.images_dir().join(name);
        if check_name {
            match fs::create_dir(&folder) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    return Ok(EnrollStatus {
                        name_already_exists: true,
                        one_face_detected: true,
                    })
                }
                Err(e) => {
                    return Err(DatabaseError::Write {
                        path: folder,
                        source: e,
                    })
                }
            }
        } else {
            fs::create_dir_all(&folder).map_err(|e| DatabaseError::Write {
                path: folder.clone(),
                source: e,
            })?;
        }

        let image_path = free_image_path(&folder, file_name);
        let rgb = image.to_rgb_image().ok_or(DatabaseError::UnsupportedFrame)?;
        rgb.save(&image_path).map_err(|e| DatabaseError::Image {
            path: image_path.clone(),
            source: e,
        })?;

        self.records.push(FaceRecord {
            encoding,
            name: name.to_string(),
            image_path,
            profile: DEFAULT_PROFILE.to_string(),
        });
        self.persist()?;
        log::info!("Enrolled {name}");
        Ok(EnrollStatus {
            name_already_exists: false,
            one_face_detected: true,
        })
    }

    /// Appends records whose images already exist on disk, persisting once.
    pub fn import(&mut self, records: Vec<FaceRecord>) -> Result<usize, DatabaseError> {
        let count = records.len();
        self.records.extend(records);
        self.persist()?;
        Ok(count)
    }

    /// Forgets every record pointing at `image_path`.
    ///
    /// With `hard`, the image file is deleted too, and its folder when that
    /// leaves it empty. A failed hard delete is logged and reported as
    /// `false`; the records stay removed.
    pub fn remove(&mut self, image_path: &Path, hard: bool) -> Result<bool, DatabaseError> {
        let before = self.records.len();
        self.records.retain(|r| r.image_path != image_path);
        log::info!(
            "Removed {} record(s) for {}",
            before - self.records.len(),
            image_path.display()
        );

        let files_deleted = if hard {
            match delete_image(image_path) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Hard remove of {} failed: {e}", image_path.display());
                    false
                }
            }
        } else {
            true
        };

        self.persist()?;
        Ok(files_deleted)
    }

    /// Path of the first image enrolled under `name`.
    pub fn image_path_for(&self, name: &str) -> Option<&Path> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.image_path.as_path())
    }

    /// Encoding of the first image enrolled under `name`.
    pub fn encoding_for(&self, name: &str) -> Option<&FaceEncoding> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.encoding)
    }

    /// Profile text for `name`, or the default text for unknown names.
    pub fn profile_for(&self, name: &str) -> &str {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.profile.as_str())
            .unwrap_or(DEFAULT_PROFILE)
    }

    /// Sets the profile of every record of `name`. Returns how many changed.
    pub fn set_profile(&mut self, name: &str, profile: &str) -> Result<usize, DatabaseError> {
        let mut updated = 0;
        for record in self.records.iter_mut().filter(|r| r.name == name) {
            record.profile = profile.to_string();
            updated += 1;
        }
        if updated > 0 {
            self.persist()?;
        }
        Ok(updated)
    }

    fn persist(&self) -> Result<(), DatabaseError> {
        let index = self.root.join(INDEX_FILE);
        let file = IndexFile {
            records: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| DatabaseError::Parse {
            path: index.clone(),
            source: e,
        })?;
        fs::write(&index, json).map_err(|e| DatabaseError::Write {
            path: index,
            source: e,
        })
    }
}

fn delete_image(image_path: &Path) -> std::io::Result<()> {
    fs::remove_file(image_path)?;
    if let Some(folder) = image_path.parent() {
        if fs::read_dir(folder)?.next().is_none() {
            fs::remove_dir(folder)?;
        }
    }
    Ok(())
}

/// Names become path components, so they must be a single normal one.
fn free_image_path(folder: &Path, file_name: &str) -> PathBuf {
    let mut path = folder.join(format!("{file_name}.jpg"));
    let mut n = 2;
    while path.exists() {
        path = folder.join(format!("{file_name}_{n}.jpg"));
        n += 1;
    }
    path
}

fn validate_component(name: &str) -> Result<(), DatabaseError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(DatabaseError::InvalidName(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn frame() -> Frame {
        Frame::new(vec![90u8; 16 * 12 * 3], 16, 12, 3, 0)
    }

    fn one_face(x: f32) -> SingleFace {
        SingleFace::Found(FaceEncoding::new(vec![x, 0.0]))
    }

    fn open(tmp: &TempDir) -> FaceDatabase {
        FaceDatabase::open(tmp.path()).unwrap()
    }

    #[test]
    fn test_open_creates_empty_database() {
        let tmp = TempDir::new().unwrap();
        let db = open(&tmp);
        assert!(db.is_empty());
        assert!(db.images_dir().is_dir());
    }

    #[test]
    fn test_add_stores_image_and_record() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);

        let status = db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();

        assert!(status.added());
        assert_eq!(db.len(), 1);
        let path = db.image_path_for("ada").unwrap();
        assert!(path.ends_with("images/ada/first.jpg"));
        assert!(path.is_file());
        assert_eq!(db.profile_for("ada"), DEFAULT_PROFILE);
    }

    #[rstest]
    #[case(SingleFace::Ambiguous(0))]
    #[case(SingleFace::Ambiguous(2))]
    fn test_add_rejects_ambiguous_faces(#[case] face: SingleFace) {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);

        let status = db.add(&frame(), face, "ada", "first", true).unwrap();

        assert_eq!(
            status,
            EnrollStatus {
                name_already_exists: false,
                one_face_detected: false
            }
        );
        assert!(db.is_empty());
        assert!(!db.images_dir().join("ada").exists());
    }

    #[test]
    fn test_add_reports_existing_name() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();

        let status = db.add(&frame(), one_face(0.2), "ada", "second", true).unwrap();

        assert!(status.name_already_exists);
        assert!(!status.added());
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_add_without_name_check_appends_another_image() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();

        let status = db.add(&frame(), one_face(0.2), "ada", "second", false).unwrap();

        assert!(status.added());
        assert_eq!(db.len(), 2);
        assert_eq!(db.names(), vec!["ada".to_string()]);
    }

    #[test]
    fn test_add_never_overwrites_an_existing_image() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        db.add(&frame(), one_face(0.1), "ada", "photo", false).unwrap();
        db.add(&frame(), one_face(0.2), "ada", "photo", false).unwrap();
        db.add(&frame(), one_face(0.3), "ada", "photo", false).unwrap();

        let paths: Vec<&Path> = db.records().iter().map(|r| r.image_path.as_path()).collect();
        assert!(paths[0].ends_with("images/ada/photo.jpg"));
        assert!(paths[1].ends_with("images/ada/photo_2.jpg"));
        assert!(paths[2].ends_with("images/ada/photo_3.jpg"));
        assert!(paths.iter().all(|p| p.is_file()));
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("a/b")]
    fn test_add_rejects_path_like_names(#[case] name: &str) {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        let result = db.add(&frame(), one_face(0.1), name, "first", true);
        assert!(matches!(result, Err(DatabaseError::InvalidName(_))));
    }

    #[test]
    fn test_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let mut db = open(&tmp);
            db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();
            db.set_profile("ada", "Digital designer").unwrap();
        }
        let db = open(&tmp);
        assert_eq!(db.len(), 1);
        assert_eq!(db.profile_for("ada"), "Digital designer");
        assert_eq!(
            db.encoding_for("ada"),
            Some(&FaceEncoding::new(vec![0.1, 0.0]))
        );
    }

    #[test]
    fn test_soft_remove_keeps_file() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();
        let path = db.image_path_for("ada").unwrap().to_path_buf();

        assert!(db.remove(&path, false).unwrap());

        assert!(db.is_empty());
        assert!(path.is_file());
    }

    #[test]
    fn test_hard_remove_deletes_file_and_empty_folder() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();
        let path = db.image_path_for("ada").unwrap().to_path_buf();

        assert!(db.remove(&path, true).unwrap());

        assert!(!path.exists());
        assert!(!db.images_dir().join("ada").exists());
        assert!(open(&tmp).is_empty());
    }

    #[test]
    fn test_hard_remove_keeps_folder_with_other_images() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();
        db.add(&frame(), one_face(0.1), "ada", "second", false).unwrap();
        let first = db.images_dir().join("ada").join("first.jpg");

        assert!(db.remove(&first, true).unwrap());

        assert_eq!(db.len(), 1);
        assert!(db.images_dir().join("ada").join("second.jpg").is_file());
    }

    #[test]
    fn test_failed_hard_remove_still_forgets_record() {
        let tmp = TempDir::new().unwrap();
        let mut db = open(&tmp);
        db.add(&frame(), one_face(0.1), "ada", "first", true).unwrap();
        let path = db.image_path_for("ada").unwrap().to_path_buf();
        fs::remove_file(&path).unwrap();

        assert!(!db.remove(&path, true).unwrap());
        assert!(db.is_empty());
    }

    #[test]
    fn test_unknown_name_lookups() {
        let tmp = TempDir::new().unwrap();
        let db = open(&tmp);
        assert!(db.image_path_for("nobody").is_none());
        assert_eq!(db.profile_for("nobody"), DEFAULT_PROFILE);
    }

    #[test]
    fn test_corrupt_index_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(INDEX_FILE), "{ nope").unwrap();
        assert!(matches!(
            FaceDatabase::open(tmp.path()),
            Err(DatabaseError::Parse { .. })
        ));
    }
}
