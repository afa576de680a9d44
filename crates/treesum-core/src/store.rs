//! Loading and atomically replacing index files.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::IndexError;
use crate::index::Index;

/// Suffix appended to the index file name for the in-progress copy.
pub const TEMP_SUFFIX: &str = ".tmp";

/// An index file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    /// Refer to the index at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file written before being renamed over the index.
    pub fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }

    /// Load the index, or `None` if the file does not exist.
    pub fn load(&self) -> Result<Option<Index>, IndexError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(IndexError::io(&self.path, err)),
        };

        codec::decode(&bytes)
            .map(Some)
            .map_err(|err| IndexError::format(&self.path, err))
    }

    /// Load the index, treating a missing file as an error.
    pub fn load_existing(&self) -> Result<Index, IndexError> {
        self.load()?.ok_or_else(|| IndexError::NotFound {
            path: self.path.clone(),
        })
    }

    /// Replace the index file with `index`.
    ///
    /// The new content is written and synced to the temporary sibling first,
    /// then renamed over the index, so readers see either the old or the new
    /// file in full.
    pub fn store(&self, index: &Index) -> Result<(), IndexError> {
        let temp = self.temp_path();

        let file = File::create(&temp).map_err(|e| IndexError::io(&temp, e))?;
        let mut writer = BufWriter::new(file);
        codec::write_index(index, &mut writer).map_err(|e| IndexError::io(&temp, e))?;
        writer.flush().map_err(|e| IndexError::io(&temp, e))?;

        let file = writer
            .into_inner()
            .map_err(|e| IndexError::io(&temp, e.into_error()))?;
        file.sync_all().map_err(|e| IndexError::io(&temp, e))?;
        drop(file);

        fs::rename(&temp, &self.path).map_err(|e| IndexError::io(&self.path, e))?;
        tracing::info!(path = %self.path.display(), entries = index.len(), "index written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ContentHash, DIGEST_LEN, Entry, Modified};
    use tempfile::TempDir;

    #[test]
    fn test_temp_path() {
        let file = IndexFile::new("/data/.sha1s");
        assert_eq!(file.temp_path(), PathBuf::from("/data/.sha1s.tmp"));
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let file = IndexFile::new(temp.path().join(".sha1s"));
        assert!(file.load().unwrap().is_none());
        assert!(matches!(file.load_existing(), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn test_store_and_load() {
        let temp = TempDir::new().unwrap();
        let file = IndexFile::new(temp.path().join(".sha1s"));

        let mut index = Index::new();
        index.insert(
            "a.txt",
            Entry::new(Modified::new(5, 6), ContentHash::new([9; DIGEST_LEN])),
        );
        file.store(&index).unwrap();

        assert!(!file.temp_path().exists());
        assert_eq!(file.load().unwrap(), Some(index));
    }

    #[test]
    fn test_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let file = IndexFile::new(temp.path().join(".sha1s"));
        fs::write(file.path(), b"a.txt\01.2\0").unwrap();
        assert!(matches!(file.load(), Err(IndexError::Format { .. })));
    }
}
