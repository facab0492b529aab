//! Error types and result aliases for Siren.
//!
//! This module defines the shared error taxonomy used across all Siren
//! components. Errors are structured for programmatic handling: the HTTP
//! layer maps each variant to a stable machine-readable code, and none of
//! them is treated as process-fatal.

use std::fmt;

/// The result type used throughout Siren.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Siren operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory field was missing or malformed. Raised before any write.
    #[error("validation error: {message}")]
    Validation {
        /// Description of what made the input invalid.
        message: String,
    },

    /// The guest counter transaction exhausted its retries. The caller must
    /// not create a request without a resolved identity.
    #[error("guest identity allocation failed: {message}")]
    IdentityAllocation {
        /// Description of the allocation failure.
        message: String,
    },

    /// The requested resource was not found.
    #[error("not found: {resource_type} with id {id}")]
    NotFound {
        /// The type of resource that was not found.
        resource_type: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A status transition violated the request state machine.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// The status the document currently holds.
        from: String,
        /// The status the caller attempted to apply.
        to: String,
    },

    /// The caller is not allowed to perform this operation.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Description of the authorization failure.
        message: String,
    },

    /// A backend write or read failed. The operation is considered
    /// not-applied; the caller may retry manually.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An upstream collaborator (geocoder, chat completion) was unreachable.
    /// Callers degrade to a fallback value; this never blocks the lifecycle.
    #[error("upstream unavailable: {message}")]
    Upstream {
        /// Description of the upstream failure.
        message: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// An internal error that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new validation error with the given message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new identity allocation error.
    #[must_use]
    pub fn identity_allocation(message: impl Into<String>) -> Self {
        Self::IdentityAllocation {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource_type: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a new invalid transition error.
    #[must_use]
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a new forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new upstream error.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true when the caller may sensibly retry the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IdentityAllocation { .. } | Self::Storage { .. } | Self::Upstream { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_resource_and_id() {
        let err = Error::not_found("request", "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert_eq!(
            err.to_string(),
            "not found: request with id 01ARZ3NDEKTSV4RRFFQ69G5FAV"
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(Error::storage("write failed").is_retryable());
        assert!(Error::identity_allocation("contention").is_retryable());
        assert!(!Error::validation("missing location").is_retryable());
        assert!(!Error::not_found("request", "x").is_retryable());
    }

    #[test]
    fn serde_errors_map_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(err), Error::Serialization { .. }));
    }
}
