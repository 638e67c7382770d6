//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Key-value backends for resource storage."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::key::ResourceKey;
use crate::{Result, StoreError};

const TEMP_SUFFIX: &str = ".tmp";

/// Minimal storage contract shared by the resource stores.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Whether a value is stored under `key`.
    fn exists(&self, key: &ResourceKey) -> Result<bool>;
    /// Fetch the stored bytes, `None` when absent.
    fn read(&self, key: &ResourceKey) -> Result<Option<Vec<u8>>>;
    /// Store `value`, replacing any previous content.
    fn write(&self, key: &ResourceKey, value: &[u8]) -> Result<()>;
    /// Store `value` only if nothing is stored under `key`; otherwise
    /// [`StoreError::Conflict`] and the existing value is left untouched.
    fn create(&self, key: &ResourceKey, value: &[u8]) -> Result<()>;
    /// Delete the value; returns `false` when nothing was stored.
    fn remove(&self, key: &ResourceKey) -> Result<bool>;
    /// Names of the values stored directly below `prefix`, sorted.
    fn list(&self, prefix: &[String]) -> Result<Vec<String>>;
    /// Backend label used in logs.
    fn backend_name(&self) -> &'static str;
}

/// Filesystem backend: key segments become nested directories below `root`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory when missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "filesystem store opened");
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the file backing `key`.
    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(key.segments());
        path
    }

    /// Metadata of `path`, `None` when nothing exists there. Any other lookup
    /// failure (permissions, a file where a directory is expected) is an error.
    fn metadata(path: &Path) -> Result<Option<fs::Metadata>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(meta)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FsStore {
    fn exists(&self, key: &ResourceKey) -> Result<bool> {
        Ok(Self::metadata(&self.path_for(key))?.is_some_and(|meta| meta.is_file()))
    }

    fn read(&self, key: &ResourceKey) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match Self::metadata(&path)? {
            Some(meta) if meta.is_file() => {}
            _ => return Ok(None),
        }
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &ResourceKey, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        self.ensure_parent(&path)?;
        // Readers never observe a half-written file.
        let temp = path.with_file_name(format!(
            ".{}.{}{}",
            key.name(),
            Uuid::new_v4().simple(),
            TEMP_SUFFIX
        ));
        let outcome = fs::write(&temp, value).and_then(|()| fs::rename(&temp, &path));
        if let Err(err) = outcome {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        debug!(path = %path.display(), bytes = value.len(), "resource written");
        Ok(())
    }

    fn create(&self, key: &ResourceKey, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        self.ensure_parent(&path)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Conflict(key.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        if let Err(err) = file.write_all(value).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(err.into());
        }
        debug!(path = %path.display(), bytes = value.len(), "resource created");
        Ok(())
    }

    fn remove(&self, key: &ResourceKey) -> Result<bool> {
        let path = self.path_for(key);
        match Self::metadata(&path)? {
            Some(meta) if meta.is_file() => {}
            _ => return Ok(false),
        }
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self, prefix: &[String]) -> Result<Vec<String>> {
        let mut dir = self.root.clone();
        dir.extend(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// In-memory backend for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<ResourceKey, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no values.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn exists(&self, key: &ResourceKey) -> Result<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn read(&self, key: &ResourceKey) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &ResourceKey, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn create(&self, key: &ResourceKey, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Err(StoreError::Conflict(key.to_string()));
        }
        entries.insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &ResourceKey) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn list(&self, prefix: &[String]) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|key| key.is_child_of(prefix))
            .map(|key| key.name().to_owned())
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::tempdir;

    fn key(parts: &[&str]) -> ResourceKey {
        ResourceKey::new(parts.iter().copied()).unwrap()
    }

    fn exercise(store: &dyn KeyValueStore) {
        let cfg = key(&["temp01", "config.json"]);
        assert!(!store.exists(&cfg).unwrap());
        assert_eq!(store.read(&cfg).unwrap(), None);

        store.create(&cfg, b"first").unwrap();
        assert!(store.exists(&cfg).unwrap());

        let err = store.create(&cfg, b"second").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.read(&cfg).unwrap().as_deref(), Some(&b"first"[..]));

        store.write(&cfg, b"replaced").unwrap();
        assert_eq!(store.read(&cfg).unwrap().as_deref(), Some(&b"replaced"[..]));

        store.write(&key(&["temp01", "alt.json"]), b"{}").unwrap();
        store.write(&key(&["hum02", "config.json"]), b"{}").unwrap();
        assert_eq!(
            store.list(&["temp01".to_owned()]).unwrap(),
            vec!["alt.json".to_owned(), "config.json".to_owned()]
        );
        assert!(store.list(&["missing".to_owned()]).unwrap().is_empty());

        assert!(store.remove(&cfg).unwrap());
        assert!(!store.remove(&cfg).unwrap());
        assert!(!store.exists(&cfg).unwrap());
    }

    #[test]
    fn memory_store_semantics() {
        let store = MemoryStore::new();
        exercise(&store);
        assert_eq!(store.len(), 2);
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn fs_store_semantics() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path().join("sensors")).unwrap();
        exercise(&store);
        assert_eq!(store.backend_name(), "filesystem");
    }

    #[test]
    fn fs_store_lays_out_nested_directories() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        let cfg = key(&["temp01", "config.json"]);
        store.write(&cfg, b"{}").unwrap();
        assert!(dir.path().join("temp01").is_dir());
        assert!(dir.path().join("temp01").join("config.json").is_file());
        assert_eq!(store.path_for(&cfg), dir.path().join("temp01/config.json"));
    }

    #[test]
    fn fs_store_lists_files_only() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        store.write(&key(&["notes.txt"]), b"hello").unwrap();
        store.write(&key(&["temp01", "config.json"]), b"{}").unwrap();
        fs::write(dir.path().join(".notes.txt.abc.tmp"), b"partial").unwrap();
        assert_eq!(store.list(&[]).unwrap(), vec!["notes.txt".to_owned()]);
    }

    #[test]
    fn fs_store_treats_directory_as_absent() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("temp01")).unwrap();
        let as_file = key(&["temp01"]);
        assert!(!store.exists(&as_file).unwrap());
        assert_eq!(store.read(&as_file).unwrap(), None);
        assert!(!store.remove(&as_file).unwrap());
    }

    #[test]
    fn fs_store_reports_blocked_paths_as_io_errors() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("temp01"), b"not a directory").unwrap();
        let cfg = key(&["temp01", "config.json"]);
        assert_eq!(store.exists(&cfg).unwrap_err().kind(), ErrorKind::Internal);
        assert_eq!(store.read(&cfg).unwrap_err().kind(), ErrorKind::Internal);
        assert_eq!(store.remove(&cfg).unwrap_err().kind(), ErrorKind::Internal);
        assert!(store.exists(&key(&["temp01"])).unwrap());
    }
}
