// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Dispatch error types.
//
// `UnsupportedMethod` and `ServerError` keep the bare wire codes remote
// callers already match on. A failure reported by the invoked operation
// itself is carried unchanged in `Service`.

use thiserror::Error;

/// Error value an operation reports; the dispatcher forwards it untouched.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The target is not `Service.Method`, or names no registered method.
    #[error("UNSUPPORTED_SERVICE_METHOD")]
    UnsupportedMethod {
        /// The target as received.
        service_method: String,
    },

    /// The operation broke the single-return-value contract.
    #[error("SERVER_ERROR")]
    ServerError,

    /// Arguments or reply slot did not have the types the operation takes.
    #[error("cannot invoke {method}: {reason}")]
    Invocation { method: String, reason: String },

    /// A method or service name that cannot be addressed as `Service.Method`.
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("method '{0}' is already registered")]
    DuplicateMethod(String),

    /// Error returned by the operation.
    #[error(transparent)]
    Service(BoxError),
}

impl DispatchError {
    pub(crate) fn unsupported(service_method: &str) -> Self {
        DispatchError::UnsupportedMethod {
            service_method: service_method.to_string(),
        }
    }

    /// The operation's own error, if it is an `E`.
    pub fn service_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            DispatchError::Service(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("NOT_FOUND")]
    struct NotFound;

    #[test]
    fn test_wire_codes() {
        assert_eq!(
            DispatchError::unsupported("Foo").to_string(),
            "UNSUPPORTED_SERVICE_METHOD"
        );
        assert_eq!(DispatchError::ServerError.to_string(), "SERVER_ERROR");
    }

    #[test]
    fn test_service_error_is_transparent() {
        let err = DispatchError::Service(Box::new(NotFound));
        assert_eq!(err.to_string(), "NOT_FOUND");
        assert!(err.service_error::<NotFound>().is_some());
        assert!(err.service_error::<std::fmt::Error>().is_none());
        assert!(DispatchError::ServerError.service_error::<NotFound>().is_none());
    }
}
