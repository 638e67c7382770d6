//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Flat text file resources."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::backend::KeyValueStore;
use crate::key::ResourceKey;
use crate::locks::KeyLocks;
use crate::{Result, StoreError};

/// Payload accepted when creating a text file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewFile {
    /// Requested name; a random `<uuid>.txt` is chosen when absent.
    #[serde(default)]
    #[schema(example = "notes.txt")]
    pub filename: Option<String>,
    /// Initial text, empty when absent.
    #[serde(default)]
    pub content: Option<String>,
}

impl NewFile {
    /// True when the caller supplied neither a name nor content.
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.content.is_none()
    }
}

/// Arbitrary named text blobs in a single flat namespace.
pub struct FileStore {
    backend: Arc<dyn KeyValueStore>,
    locks: KeyLocks,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("backend", &self.backend.backend_name())
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Build a store on top of `backend`.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            locks: KeyLocks::new(),
        }
    }

    /// All stored file names, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        self.backend.list(&[])
    }

    /// Text content of `name`.
    pub fn get(&self, name: &str) -> Result<String> {
        let key = ResourceKey::single(name)?;
        let bytes = self
            .backend
            .read(&key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        String::from_utf8(bytes).map_err(|_| StoreError::InvalidText(key.to_string()))
    }

    /// Whether `name` is stored.
    pub fn exists(&self, name: &str) -> Result<bool> {
        self.backend.exists(&ResourceKey::single(name)?)
    }

    /// Create a file and return its name. An existing name is a conflict.
    pub fn create(&self, body: Option<NewFile>) -> Result<String> {
        let body = match body {
            Some(body) if !body.is_empty() => body,
            _ => return Err(StoreError::MissingBody("JSON body")),
        };
        let filename = body
            .filename
            .unwrap_or_else(|| format!("{}.txt", Uuid::new_v4()));
        let key = ResourceKey::single(&filename)?;
        let content = body.content.unwrap_or_default();
        self.locks
            .with_lock(&key, || self.backend.create(&key, content.as_bytes()))?;
        info!(filename = %filename, bytes = content.len(), "file created");
        Ok(filename)
    }

    /// Overwrite the content of an existing file. `None` means the caller sent
    /// no body; `Some(None)` a body without `content`, stored as empty text.
    pub fn update(&self, name: &str, content: Option<Option<String>>) -> Result<()> {
        let key = ResourceKey::single(name)?;
        self.locks.with_lock(&key, || {
            if !self.backend.exists(&key)? {
                return Err(StoreError::NotFound(key.to_string()));
            }
            let content = content
                .ok_or(StoreError::MissingBody("JSON body"))?
                .unwrap_or_default();
            self.backend.write(&key, content.as_bytes())?;
            info!(filename = name, bytes = content.len(), "file updated");
            Ok(())
        })
    }

    /// Remove `name`.
    pub fn delete(&self, name: &str) -> Result<()> {
        let key = ResourceKey::single(name)?;
        let removed = self
            .locks
            .with_lock(&key, || self.backend.remove(&key))?;
        if !removed {
            return Err(StoreError::NotFound(key.to_string()));
        }
        info!(filename = name, "file deleted");
        Ok(())
    }
}
