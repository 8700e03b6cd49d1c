use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

type StorageResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Durable key/value storage backing a [`SessionStore`](super::SessionStore).
///
/// The store keeps two keys here ([`CREDENTIAL_KEY`](crate::types::CREDENTIAL_KEY)
/// and [`CLAIMS_KEY`](crate::types::CLAIMS_KEY)), written and cleared together,
/// and reads them back at construction to restore the previous session.
///
/// # Example
///
/// ```rust,ignore
/// impl CredentialStorage for KeyringStorage {
///     fn load(&self, key: &str) -> Result<Option<String>, ...> {
///         Ok(self.keyring.get(key)?)
///     }
///     fn store(&self, key: &str, value: &str) -> Result<(), ...> {
///         self.keyring.set(key, value)
///     }
///     fn remove(&self, key: &str) -> Result<(), ...> {
///         self.keyring.delete(key)
///     }
/// }
/// ```
pub trait CredentialStorage: Send + Sync + 'static {
    /// Read a value. Returns `None` if the key was never written or was removed.
    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn store(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
///
/// Writes go to a temporary file in the same directory that is renamed over
/// the target, so readers never see a partial value. On Unix the files are
/// readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for session files. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(format!("invalid storage key: {key:?}").into());
        }
        Ok(self.dir.join(key))
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        match std::fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match std::fs::remove_file(self.path(key)?) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load("k").unwrap(), None);

        storage.store("k", "v1").unwrap();
        storage.store("k", "v2").unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("v2"));

        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.load("k").unwrap(), None);
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let session_dir = dir.path().join("session");

        FileStorage::new(&session_dir).store("oauth2_token", "abc").unwrap();

        let reopened = FileStorage::new(&session_dir);
        assert_eq!(reopened.load("oauth2_token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn file_storage_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.remove("user_info").unwrap();
        storage.store("user_info", "{}").unwrap();
        storage.remove("user_info").unwrap();
        assert_eq!(storage.load("user_info").unwrap(), None);
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(storage.store("../escape", "x").is_err());
        assert!(storage.load("").is_err());
    }

    #[test]
    fn file_storage_overwrite_leaves_no_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.store("oauth2_token", "first").unwrap();
        storage.store("oauth2_token", "second").unwrap();

        assert_eq!(storage.load("oauth2_token").unwrap().as_deref(), Some("second"));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["oauth2_token"]);
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.store("oauth2_token", "secret").unwrap();

        let mode = std::fs::metadata(dir.path().join("oauth2_token"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
