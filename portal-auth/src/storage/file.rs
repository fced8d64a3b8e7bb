//! Storage backed by a single JSON object file on disk.

use std::collections::BTreeMap;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::*;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::error::{storage_error, Error, StorageErrorKind};

type Entries = BTreeMap<String, String>;

/// Key-value storage persisted as `{"key": "value", ...}` in one file.
///
/// A missing file reads as empty. A file that is not a JSON object of strings is
/// also read as empty (and logged): the data it held is unusable, and the next
/// write replaces it. Writes go to a uniquely named sibling temp file, readable
/// only by the owner, that is then renamed over the target. A crash mid-write
/// leaves the previous contents intact, and the stored token is never readable
/// by other users.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries, Error> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Entries::new()),
            Err(err) => return Err(storage_error(StorageErrorKind::Read, err)),
        };

        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }

        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(
                    "Ignoring unreadable storage file {}: {}",
                    self.path.display(),
                    err
                );
                Ok(Entries::new())
            }
        }
    }

    async fn save(&self, entries: &Entries) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|err| storage_error(StorageErrorKind::Write, err))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| storage_error(StorageErrorKind::Write, err))?;
        }

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_private(&path, json.as_bytes()))
            .await
            .map_err(|err| storage_error(StorageErrorKind::Write, err))??;

        trace!("Wrote {} storage entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

/// Replace `path` with `contents` through a fresh temp file in the same directory.
fn write_private(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let write_error = |err| storage_error(StorageErrorKind::Write, err);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(contents).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    tmp.persist(path)
        .map_err(|err| storage_error(StorageErrorKind::Write, err))?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));

        assert_eq!(store.get("token").await.unwrap(), None);
        // Removing from a file that does not exist must not create it.
        store.remove("token").await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_a_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::new(&path);
        store.set("token", "t1").await.unwrap();
        store.set("user", r#"{"emailId":"a@x.com"}"#).await.unwrap();
        drop(store);

        let reloaded = FileStore::new(&path);
        assert_eq!(reloaded.get("token").await.unwrap().as_deref(), Some("t1"));
        assert_eq!(
            reloaded.get("user").await.unwrap().as_deref(),
            Some(r#"{"emailId":"a@x.com"}"#)
        );
    }

    #[tokio::test]
    async fn test_remove_keeps_other_entries() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set("token", "t1").await.unwrap();
        store.set("theme", "dark").await.unwrap();

        store.remove("token").await.unwrap();

        assert_eq!(store.get("token").await.unwrap(), None);
        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("dark"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        // A file left behind with loose permissions is replaced, not reused.
        tokio::fs::write(&path, "{}").await.unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::new(&path);
        store.set("token", "bearer-secret").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "mode {:o} lets others read the token", mode);
    }

    #[tokio::test]
    async fn test_writes_leave_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set("token", "t1").await.unwrap();
        store.set("user", "{}").await.unwrap();
        store.remove("token").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty_and_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("token").await.unwrap(), None);

        store.set("token", "t2").await.unwrap();
        assert_eq!(store.get("token").await.unwrap().as_deref(), Some("t2"));
    }
}
