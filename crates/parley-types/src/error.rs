use thiserror::Error;

/// Errors from repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors returned by the session, message, and subscription services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Target entity is missing or soft-deleted.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller does not own the target entity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Duplicate under normal, non-racing flow.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A constraint rejected a write that lost a race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input rejected before any store access.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The record store failed; the caller may retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::StoreUnavailable(_))
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::PermissionDenied(_) => "permission_denied",
            ServiceError::AlreadyExists(_) => "already_exists",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::ValidationFailed(_) => "validation_failed",
            ServiceError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound("entity not found".to_string()),
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            RepositoryError::Connection(msg) | RepositoryError::Query(msg) => {
                ServiceError::StoreUnavailable(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_service_error_from_repository_error() {
        let err: ServiceError = RepositoryError::Conflict("dup".to_string()).into();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "dup"));

        let err: ServiceError = RepositoryError::Connection("pool timed out".to_string()).into();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "store_unavailable");

        let err: ServiceError = RepositoryError::NotFound.into();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::PermissionDenied("session abc".to_string());
        assert_eq!(err.to_string(), "permission denied: session abc");
    }
}
