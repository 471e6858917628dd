// SPDX-License-Identifier: PMPL-1.0-or-later
//
// API error envelope.
//
// Storage failures are translated here and nowhere else: a missing object
// keeps its `NOT_FOUND` code, anything else is reported as a server error
// carrying the cause.

use tarifa_storage::{StorageError, TenantScoped};
use thiserror::Error;

/// Reply of successful write operations.
pub const OK: &str = "OK";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Key fields absent from the request, in declaration order.
    #[error("MANDATORY_IE_MISSING: [{}]", .0.join(" "))]
    MandatoryFieldMissing(Vec<String>),

    #[error("NOT_FOUND")]
    NotFound,

    #[error("SERVER_ERROR: {0}")]
    ServerError(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::NotFound,
            other => ApiError::ServerError(other.to_string()),
        }
    }
}

/// Reject `arg` unless both its tenant and id are set.
pub fn require_tenant_id<T: TenantScoped + ?Sized>(arg: &T) -> Result<(), ApiError> {
    let missing = arg.missing_key_fields();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ApiError::MandatoryFieldMissing(
        missing.into_iter().map(str::to_string).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarifa_storage::TenantId;

    #[test]
    fn test_envelope_codes() {
        assert_eq!(
            ApiError::MandatoryFieldMissing(vec!["Tenant".into(), "ID".into()]).to_string(),
            "MANDATORY_IE_MISSING: [Tenant ID]"
        );
        assert_eq!(ApiError::NotFound.to_string(), "NOT_FOUND");
    }

    #[test]
    fn test_storage_translation() {
        let not_found: ApiError = StorageError::NotFound("sqp cgrates.org:SQ1".into()).into();
        assert_eq!(not_found, ApiError::NotFound);

        let down: ApiError = StorageError::BackendUnavailable("connection reset".into()).into();
        assert_eq!(
            down.to_string(),
            "SERVER_ERROR: backend unavailable: connection reset"
        );
    }

    #[test]
    fn test_require_tenant_id() {
        assert!(require_tenant_id(&TenantId::new("cgrates.org", "SQ1")).is_ok());
        assert_eq!(
            require_tenant_id(&TenantId::new("cgrates.org", "")),
            Err(ApiError::MandatoryFieldMissing(vec!["ID".to_string()]))
        );
    }
}
