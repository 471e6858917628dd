// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Storage error types for the Tarifa storage layer.
//
// One enum covers both runtime failures of an engine (missing objects,
// marshaling problems, unavailable backends) and the startup failures of the
// backend factory (unknown backend tag, invalid backend parameters). The
// factory-time variants are fatal: a process must not continue with a
// half-configured storage layer.

use thiserror::Error;

use crate::factory::Capability;

/// Errors that can occur when building or using a storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// An object with the same identity is already stored.
    #[error("EXISTS: {0}")]
    Duplicate(String),

    /// Failed to serialize or deserialize a value.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The storage backend is not available (e.g., connection lost).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend tag is not one of the tags registered for the capability.
    #[error(
        "unknown {capability} backend '{given}', valid options are [{}]",
        .valid.join(", ")
    )]
    UnsupportedBackend {
        /// Capability the factory was asked to build.
        capability: Capability,
        /// The tag found in configuration.
        given: String,
        /// Tags registered for this capability, in registration order.
        valid: Vec<&'static str>,
    },

    /// A backend-specific parameter failed validation.
    #[error("invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// A constructor was registered twice under the same backend tag.
    #[error("backend '{tag}' is already registered for {capability}")]
    DuplicateBackend {
        /// Capability whose registry rejected the entry.
        capability: Capability,
        /// The tag registered twice.
        tag: &'static str,
    },
}

impl StorageError {
    /// Whether this error means the storage layer cannot be assembled.
    ///
    /// Startup code aborts on these instead of serving traffic without a
    /// storage capability.
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            StorageError::UnsupportedBackend { .. }
                | StorageError::InvalidConfig(_)
                | StorageError::DuplicateBackend { .. }
        )
    }

    /// Whether this error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Convenience alias used throughout the crate.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::NotFound("sqp cgrates.org:SQ1".to_string());
        assert_eq!(err.to_string(), "NOT_FOUND: sqp cgrates.org:SQ1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unsupported_backend_lists_valid_tags() {
        let err = StorageError::UnsupportedBackend {
            capability: Capability::DataDb,
            given: "cassandra".to_string(),
            valid: vec!["redis", "mongo"],
        };
        assert_eq!(
            err.to_string(),
            "unknown data_db backend 'cassandra', valid options are [redis, mongo]"
        );
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let err = StorageError::InvalidConfig("redis db name must be an integer".to_string());
        assert!(err.to_string().starts_with("invalid storage configuration"));
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_runtime_errors_are_not_fatal() {
        assert!(!StorageError::NotFound("x".into()).is_fatal_config());
        assert!(!StorageError::BackendUnavailable("down".into()).is_fatal_config());
        assert!(!StorageError::SerializationError("bad".into()).is_fatal_config());
    }

    #[test]
    fn test_duplicate_backend_display() {
        let err = StorageError::DuplicateBackend {
            capability: Capability::CdrDb,
            tag: "mysql",
        };
        assert_eq!(err.to_string(), "backend 'mysql' is already registered for cdr_db");
    }
}
