use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::profile::domain::description::Description;

#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("failed to read description {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not in the CARD:/BIO: format")]
    Malformed(PathBuf),
}

/// Folder of plain-text descriptions, one `<name>.txt` per person.
pub struct DescriptionStore {
    root: PathBuf,
}

impl DescriptionStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.txt"))
    }

    /// Description of `name`, `None` when the person has no file.
    pub fn description_for(&self, name: &str) -> Result<Option<Description>, DescriptionError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }
        read_description(&path).map(Some)
    }

    /// Words of every description in the folder, in file-name order.
    /// Malformed files are logged and left out.
    pub fn corpus(&self) -> Result<Vec<String>, DescriptionError> {
        let read_err = |e: std::io::Error| DescriptionError::Read {
            path: self.root.clone(),
            source: e,
        };
        let mut paths = fs::read_dir(&self.root)
            .map_err(read_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;
        paths.retain(|p| p.extension().is_some_and(|e| e == "txt"));
        paths.sort();

        let mut words = Vec::new();
        for path in paths {
            match read_description(&path) {
                Ok(d) => words.extend(d.words()),
                Err(DescriptionError::Malformed(p)) => {
                    log::warn!("Skipping malformed description {}", p.display());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(words)
    }
}

fn read_description(path: &Path) -> Result<Description, DescriptionError> {
    let text = fs::read_to_string(path).map_err(|e| DescriptionError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    Description::parse(&text).ok_or_else(|| DescriptionError::Malformed(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(format!("{name}.txt")), text).unwrap();
    }

    #[test]
    fn test_description_for_known_and_unknown() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ada", "CARD:\nAda\nAnalyst, London\nLondon\nBIO:\nAbout\ncloud\n");
        let store = DescriptionStore::new(tmp.path());

        let ada = store.description_for("ada").unwrap().unwrap();
        assert_eq!(ada.words(), vec!["analyst", "cloud"]);
        assert!(store.description_for("bob").unwrap().is_none());
    }

    #[test]
    fn test_corpus_concatenates_descriptions_and_skips_malformed() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ada", "CARD:\nAda\nAnalyst, London\nLondon\nBIO:\nAbout\ncloud\n");
        write(tmp.path(), "bob", "CARD:\nBob\nEngineer, Leeds\nLeeds\nBIO:\nAbout\nsteel\n");
        write(tmp.path(), "broken", "just some text");
        fs::write(tmp.path().join("photo.jpg"), b"").unwrap();

        let corpus = DescriptionStore::new(tmp.path()).corpus().unwrap();

        assert_eq!(corpus, vec!["analyst", "cloud", "engineer", "steel"]);
    }

    #[test]
    fn test_malformed_description_is_an_error_when_asked_for() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ada", "no markers");
        let result = DescriptionStore::new(tmp.path()).description_for("ada");
        assert!(matches!(result, Err(DescriptionError::Malformed(_))));
    }
}
