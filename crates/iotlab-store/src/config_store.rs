//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Per-sensor configuration resources."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
//! Per-sensor configuration resources.
//!
//! Each resource is addressed by `(sensor id, configuration name)` and moves
//! through `ABSENT -> create -> PRESENT -> update* -> PRESENT`. Creating an
//! existing resource and updating a missing one both fail; there is no delete.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::backend::KeyValueStore;
use crate::key::ResourceKey;
use crate::locks::KeyLocks;
use crate::{Result, StoreError};

/// Name of the configuration resource written by [`ConfigStore::create`].
pub const DEFAULT_CONFIG_NAME: &str = "config.json";
/// Scale applied when a created configuration omits it.
pub const DEFAULT_SCALE: &str = "Celsius";
/// Sampling frequency applied when a created configuration omits it.
pub const DEFAULT_FREQUENCY: &str = "1Hz";

/// How a sensor should be read. Both fields are optional so an update can
/// store exactly what the caller supplied. Any other key is a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    /// Measurement scale, e.g. `Celsius`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Celsius")]
    pub scale: Option<String>,
    /// Sampling frequency, e.g. `1Hz`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "1Hz")]
    pub frequency: Option<String>,
}

impl SensorConfig {
    /// Configuration with both fields set.
    pub fn new(scale: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            scale: Some(scale.into()),
            frequency: Some(frequency.into()),
        }
    }

    /// Fill missing fields with [`DEFAULT_SCALE`] and [`DEFAULT_FREQUENCY`].
    pub fn with_defaults(self) -> Self {
        Self {
            scale: self.scale.or_else(|| Some(DEFAULT_SCALE.to_owned())),
            frequency: self.frequency.or_else(|| Some(DEFAULT_FREQUENCY.to_owned())),
        }
    }

    /// True when neither field is present.
    pub fn is_empty(&self) -> bool {
        self.scale.is_none() && self.frequency.is_none()
    }
}

/// Store for [`SensorConfig`] resources laid out as `<sensor id>/<name>`.
pub struct ConfigStore {
    backend: Arc<dyn KeyValueStore>,
    locks: KeyLocks,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("backend", &self.backend.backend_name())
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Build a store on top of `backend`.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            locks: KeyLocks::new(),
        }
    }

    /// Resolve the key for `(sensor_id, name)`, rejecting unsafe identifiers.
    pub fn key(sensor_id: &str, name: &str) -> Result<ResourceKey> {
        ResourceKey::new([sensor_id, name])
    }

    /// Create the default configuration resource for `sensor_id`.
    ///
    /// Supplied fields override the defaults. Fails with
    /// [`StoreError::Conflict`] when the resource already exists, leaving the
    /// stored object untouched.
    pub fn create(&self, sensor_id: &str, body: Option<SensorConfig>) -> Result<SensorConfig> {
        let key = Self::key(sensor_id, DEFAULT_CONFIG_NAME)?;
        let config = body.unwrap_or_default().with_defaults();
        let encoded = serde_json::to_vec_pretty(&config)?;
        self.locks
            .with_lock(&key, || self.backend.create(&key, &encoded))?;
        info!(sensor_id, config_name = DEFAULT_CONFIG_NAME, "sensor configuration created");
        Ok(config)
    }

    /// Replace the configuration stored under `(sensor_id, name)`.
    ///
    /// The new object replaces the old one wholesale; fields not supplied are
    /// dropped. Absence is checked before the body, so a missing resource is
    /// reported as [`StoreError::NotFound`] even when the body is also empty.
    pub fn update(
        &self,
        sensor_id: &str,
        name: &str,
        body: Option<SensorConfig>,
    ) -> Result<SensorConfig> {
        let key = Self::key(sensor_id, name)?;
        self.locks.with_lock(&key, || {
            if !self.backend.exists(&key)? {
                return Err(StoreError::NotFound(key.to_string()));
            }
            let config = match body {
                Some(config) if !config.is_empty() => config,
                _ => return Err(StoreError::MissingBody("config data")),
            };
            let encoded = serde_json::to_vec_pretty(&config)?;
            self.backend.write(&key, &encoded)?;
            info!(sensor_id, config_name = name, "sensor configuration replaced");
            Ok(config)
        })
    }

    /// Fetch the configuration stored under `(sensor_id, name)`.
    pub fn get(&self, sensor_id: &str, name: &str) -> Result<SensorConfig> {
        let key = Self::key(sensor_id, name)?;
        let bytes = self
            .backend
            .read(&key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        debug!(sensor_id, config_name = name, "sensor configuration read");
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Whether a configuration is stored under `(sensor_id, name)`.
    pub fn exists(&self, sensor_id: &str, name: &str) -> Result<bool> {
        self.backend.exists(&Self::key(sensor_id, name)?)
    }

    /// Names of the configuration resources stored for `sensor_id`.
    pub fn list(&self, sensor_id: &str) -> Result<Vec<String>> {
        crate::key::validate_identifier(sensor_id)?;
        self.backend.list(&[sensor_id.to_owned()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FsStore, MemoryStore};
    use crate::ErrorKind;
    use tempfile::tempdir;

    fn memory_store() -> ConfigStore {
        ConfigStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn create_without_body_uses_defaults() {
        let store = memory_store();
        let config = store.create("temp01", None).unwrap();
        assert_eq!(config, SensorConfig::new("Celsius", "1Hz"));
        assert_eq!(store.get("temp01", DEFAULT_CONFIG_NAME).unwrap(), config);
    }

    #[test]
    fn create_merges_supplied_fields_over_defaults() {
        let store = memory_store();
        let body = SensorConfig {
            scale: Some("Kelvin".into()),
            frequency: None,
        };
        let config = store.create("temp01", Some(body)).unwrap();
        assert_eq!(config, SensorConfig::new("Kelvin", "1Hz"));
    }

    #[test]
    fn second_create_conflicts_and_keeps_original() {
        let store = memory_store();
        let first = store
            .create("temp01", Some(SensorConfig::new("Kelvin", "2Hz")))
            .unwrap();
        let err = store.create("temp01", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.get("temp01", DEFAULT_CONFIG_NAME).unwrap(), first);
    }

    #[test]
    fn update_replaces_without_merging() {
        let store = memory_store();
        store.create("temp01", None).unwrap();
        let body = SensorConfig {
            scale: Some("Fahrenheit".into()),
            frequency: None,
        };
        let updated = store
            .update("temp01", DEFAULT_CONFIG_NAME, Some(body.clone()))
            .unwrap();
        assert_eq!(updated, body);
        let stored = store.get("temp01", DEFAULT_CONFIG_NAME).unwrap();
        assert_eq!(stored.scale.as_deref(), Some("Fahrenheit"));
        assert_eq!(stored.frequency, None);
    }

    #[test]
    fn update_of_missing_resource_is_not_found() {
        let store = memory_store();
        let err = store
            .update("ghost", DEFAULT_CONFIG_NAME, Some(SensorConfig::new("K", "1Hz")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Absence takes precedence over a missing body.
        let err = store.update("ghost", DEFAULT_CONFIG_NAME, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn update_with_empty_body_is_rejected_without_mutation() {
        let store = memory_store();
        let created = store.create("temp01", None).unwrap();
        for body in [None, Some(SensorConfig::default())] {
            let err = store
                .update("temp01", DEFAULT_CONFIG_NAME, body)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);
        }
        assert_eq!(store.get("temp01", DEFAULT_CONFIG_NAME).unwrap(), created);
    }

    #[test]
    fn unsafe_identifiers_are_rejected() {
        let store = memory_store();
        assert_eq!(
            store.create("../etc", None).unwrap_err().kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            store
                .update("temp01", "../../passwd", Some(SensorConfig::new("K", "1Hz")))
                .unwrap_err()
                .kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(store.get("..", "config.json").unwrap_err().kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn blocked_sensor_directory_surfaces_as_internal() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(Arc::new(FsStore::new(dir.path()).unwrap()));
        std::fs::write(dir.path().join("temp01"), b"stray").unwrap();
        let err = store
            .update("temp01", "config.json", Some(SensorConfig::new("Kelvin", "5Hz")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(
            store.get("temp01", "config.json").unwrap_err().kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn unknown_keys_fail_to_decode() {
        let err = serde_json::from_str::<SensorConfig>(r#"{"unit":"K"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field `unit`"));
        assert!(serde_json::from_str::<SensorConfig>(r#"{"scale":"K","offset":3}"#).is_err());
        let empty: SensorConfig = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn end_to_end_lifecycle_on_filesystem() {
        let dir = tempdir().unwrap();
        let backend = FsStore::new(dir.path().join("sensors")).unwrap();
        let store = ConfigStore::new(Arc::new(backend));

        let created = store.create("temp01", None).unwrap();
        assert_eq!(created, SensorConfig::new("Celsius", "1Hz"));

        let updated = store
            .update("temp01", "config.json", Some(SensorConfig::new("Kelvin", "5Hz")))
            .unwrap();
        assert_eq!(updated, SensorConfig::new("Kelvin", "5Hz"));

        assert_eq!(
            store.create("temp01", None).unwrap_err().kind(),
            ErrorKind::Conflict
        );

        let path = dir.path().join("sensors").join("temp01").join("config.json");
        let on_disk: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::json!({"scale": "Kelvin", "frequency": "5Hz"}));
        assert_eq!(store.list("temp01").unwrap(), vec!["config.json".to_owned()]);
    }

    #[test]
    fn concurrent_creates_yield_single_winner() {
        let store = Arc::new(memory_store());
        let handles: Vec<_> = (0..8)
            .map(|idx| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.create("shared", Some(SensorConfig::new(format!("S{idx}"), "1Hz")))
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| err.kind() == ErrorKind::Conflict));
    }
}
