//! File-backed session storage
//!
//! One file per key under a directory: the native counterpart of the
//! browser's `localStorage`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use shared::{SessionStorage, StorageError, StorageResult};

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StorageError::Unavailable(format!("invalid storage key {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::Io(e.to_string()))?;

        // Write then rename so a crash never leaves a half-written value.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}
