//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Resource keys and identifier validation."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::fmt;

use crate::{Result, StoreError};

const MAX_SEGMENT_BYTES: usize = 255;

/// Check that a caller-supplied identifier is usable as a single path segment.
///
/// Rejects empty names, `.` and `..`, separators (`/`, `\`), NUL and names
/// longer than 255 bytes, so a key can never escape its store root.
pub fn validate_identifier(value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative path component")
    } else if value.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if value.contains('\0') {
        Some("must not contain NUL bytes")
    } else if value.len() > MAX_SEGMENT_BYTES {
        Some("must be at most 255 bytes long")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidIdentifier {
            value: value.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Hierarchical key made of validated segments, e.g. `["temp01", "config.json"]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    segments: Vec<String>,
}

impl ResourceKey {
    /// Build a key, validating every segment. At least one segment is required.
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(StoreError::InvalidIdentifier {
                value: String::new(),
                reason: "key must contain at least one segment",
            });
        }
        for segment in &segments {
            validate_identifier(segment)?;
        }
        Ok(Self { segments })
    }

    /// Key of a single top-level resource.
    pub fn single(name: &str) -> Result<Self> {
        Self::new([name])
    }

    /// All segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments of the enclosing namespace (empty for top-level keys).
    pub fn namespace(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Final segment naming the resource itself.
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Whether `prefix` names this key's enclosing namespace exactly.
    pub fn is_child_of(&self, prefix: &[String]) -> bool {
        self.namespace() == prefix
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn accepts_ordinary_identifiers() {
        for id in ["temp01", "config.json", "a b", "sensor-ä", ".hidden", "x..y"] {
            validate_identifier(id).unwrap();
        }
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for id in ["", ".", "..", "../etc", "a/b", "a\\b", "nul\0byte"] {
            let err = validate_identifier(id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest, "{id:?}");
        }
        assert!(validate_identifier(&"x".repeat(256)).is_err());
        assert!(validate_identifier(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn key_accessors() {
        let key = ResourceKey::new(["temp01", "config.json"]).unwrap();
        assert_eq!(key.name(), "config.json");
        assert_eq!(key.namespace(), ["temp01".to_owned()]);
        assert_eq!(key.to_string(), "temp01/config.json");
        assert!(key.is_child_of(&["temp01".to_owned()]));
        assert!(!key.is_child_of(&[]));

        let top = ResourceKey::single("notes.txt").unwrap();
        assert!(top.namespace().is_empty());
        assert!(top.is_child_of(&[]));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(ResourceKey::new(Vec::<String>::new()).is_err());
        assert!(ResourceKey::new(["temp01", ".."]).is_err());
    }
}
