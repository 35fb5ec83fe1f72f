//! Cloud provider error types

use crate::action::OperationKind;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// Bad bucket name, bad region or otherwise unusable desired state.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Bucket name '{0}' is already taken by another account. \
         Bucket names are globally unique; choose a different name and re-run"
    )]
    BucketNameConflict(String),

    /// Throttling, 5xx responses, dropped connections.
    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error(
        "Partial apply: {failed} failed after {} completed operation(s) [{}]; re-run apply to finish: {source}",
        .completed.len(),
        join_operations(.completed)
    )]
    PartialApply {
        completed: Vec<OperationKind>,
        failed: OperationKind,
        source: Box<CloudError>,
    },

    #[error("Output not ready: {0}")]
    NotReady(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Bucket '{0}' is not empty; empty it first or set force-destroy")]
    BucketNotEmpty(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the operation that produced this error may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CloudError::Transient(_) | CloudError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

fn join_operations(operations: &[OperationKind]) -> String {
    operations
        .iter()
        .map(|op| op.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CloudError::Transient("SlowDown".into()).is_retryable());
        assert!(CloudError::Timeout("create_bucket".into()).is_retryable());
        assert!(!CloudError::BucketNameConflict("taken".into()).is_retryable());
        assert!(!CloudError::InvalidConfig("bad".into()).is_retryable());
        assert!(!CloudError::NotReady("no bucket".into()).is_retryable());
    }

    #[test]
    fn test_partial_apply_message_lists_completed_operations() {
        let err = CloudError::PartialApply {
            completed: vec![OperationKind::CreateBucket, OperationKind::PutWebsiteConfig],
            failed: OperationKind::PutBucketPolicy,
            source: Box::new(CloudError::ApiError("AccessDenied".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("PutBucketPolicy failed after 2 completed operation(s)"));
        assert!(msg.contains("CreateBucket, PutWebsiteConfig"));
        assert!(msg.contains("AccessDenied"));
    }

    #[test]
    fn test_conflict_message_suggests_new_name() {
        let msg = CloudError::BucketNameConflict("my-site".into()).to_string();
        assert!(msg.contains("my-site"));
        assert!(msg.contains("choose a different name"));
    }
}
