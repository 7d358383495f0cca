use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use crate::error::StoreError;

use super::BlobStore;

/// Blob store backed by a bucket directory on the local filesystem.
///
/// Writes go to a temporary sibling file and are renamed into place, so a
/// blob is always either the complete old content or the complete new one.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if needed) the bucket directory at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io {
            name: root.display().to_string(),
            source: e,
        })?;

        Ok(Self { root })
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn io_error(name: &str, source: io::Error) -> StoreError {
        StoreError::Io { name: name.to_string(), source }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.blob_path(name).is_file())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        match fs::read(self.blob_path(name)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(Self::io_error(name, e)),
        }
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.blob_path(name);
        let tmp = tmp_path(&path);

        fs::write(&tmp, bytes).map_err(|e| Self::io_error(name, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_error(name, e))
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.blob_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(name, e)),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_blob_through_the_bucket_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).expect("open bucket");

        assert!(!store.exists("seattle.csv").await.unwrap());
        store.write("seattle.csv", b"header\nrow\n").await.unwrap();

        assert!(store.exists("seattle.csv").await.unwrap());
        assert_eq!(store.read("seattle.csv").await.unwrap(), b"header\nrow\n");
    }

    #[tokio::test]
    async fn second_write_fully_replaces_the_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).expect("open bucket");

        store.write("london.csv", b"old old old old").await.unwrap();
        store.write("london.csv", b"new").await.unwrap();

        assert_eq!(store.read("london.csv").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn read_of_absent_blob_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).expect("open bucket");

        let err = store.read("missing.csv").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(name) if name == "missing.csv"));
    }

    #[tokio::test]
    async fn delete_removes_the_blob_and_tolerates_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).expect("open bucket");

        store.delete("missing.csv").await.unwrap();

        store.write("beijing.csv", b"rows").await.unwrap();
        store.delete("beijing.csv").await.unwrap();
        assert!(!store.exists("beijing.csv").await.unwrap());
    }
}
