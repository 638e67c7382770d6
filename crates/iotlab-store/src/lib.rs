//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Resource storage abstractions and bindings."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Storage for sensor configuration resources and plain text files.
//!
//! Both stores sit on a [`KeyValueStore`] so the filesystem layout used in
//! deployment and the in-memory map used in tests share the same semantics.

/// Result alias used throughout the store crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Caller-facing classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource already exists.
    Conflict,
    /// The resource does not exist.
    NotFound,
    /// Input was missing or malformed.
    BadRequest,
    /// Storage or serialization failure on the server side.
    Internal,
}

/// Error type for the store subsystem.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A resource with the same key is already present.
    #[error("resource {0} already exists")]
    Conflict(String),
    /// No resource is stored under the key.
    #[error("resource {0} does not exist")]
    NotFound(String),
    /// An identifier cannot be used as a key segment.
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier as supplied by the caller.
        value: String,
        /// Rule the identifier violates.
        reason: &'static str,
    },
    /// A required request body was absent or empty.
    #[error("missing {0}")]
    MissingBody(&'static str),
    /// Wrapper for IO errors raised by the filesystem backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON encoding or decoding issues of stored resources.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Stored bytes are not valid UTF-8 text.
    #[error("resource {0} is not valid utf-8")]
    InvalidText(String),
}

impl StoreError {
    /// Map the error onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidIdentifier { .. } | StoreError::MissingBody(_) => {
                ErrorKind::BadRequest
            }
            StoreError::Io(_) | StoreError::Json(_) | StoreError::InvalidText(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub mod backend;
pub mod config_store;
pub mod file_store;
pub mod key;
pub mod locks;

pub use backend::{FsStore, KeyValueStore, MemoryStore};
pub use config_store::{
    ConfigStore, SensorConfig, DEFAULT_CONFIG_NAME, DEFAULT_FREQUENCY, DEFAULT_SCALE,
};
pub use file_store::{FileStore, NewFile};
pub use key::{validate_identifier, ResourceKey};
pub use locks::KeyLocks;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(StoreError::Conflict("a".into()).kind(), ErrorKind::Conflict);
        assert_eq!(StoreError::NotFound("a".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StoreError::MissingBody("config data").kind(),
            ErrorKind::BadRequest
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(StoreError::from(io).kind(), ErrorKind::Internal);
    }

    #[test]
    fn error_messages_are_readable() {
        let err = StoreError::InvalidIdentifier {
            value: "../etc".into(),
            reason: "must not contain path separators",
        };
        assert_eq!(
            format!("{err}"),
            "invalid identifier \"../etc\": must not contain path separators"
        );
        assert_eq!(
            format!("{}", StoreError::MissingBody("config data")),
            "missing config data"
        );
    }
}
