//! Mapping of S3 failures onto [`CloudError`]

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use siteflow_cloud::CloudError;

const TRANSIENT_CODES: &[&str] = &[
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "RequestTimeout",
    "InternalError",
    "ServiceUnavailable",
    "OperationAborted",
];

const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchBucket",
    "NoSuchBucketPolicy",
    "NoSuchWebsiteConfiguration",
    "NoSuchPublicAccessBlockConfiguration",
    "NotFound",
];

const AUTH_CODES: &[&str] = &[
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
    "TokenRefreshRequired",
];

const INVALID_CONFIG_CODES: &[&str] = &[
    "InvalidBucketName",
    "InvalidLocationConstraint",
    "IllegalLocationConstraintException",
    "MalformedPolicy",
    "InvalidArgument",
];

/// Classify a service response by error code and HTTP status.
///
/// The code wins when it is known; the status is the fallback for responses
/// without a parseable body (e.g. `HeadBucket`).
pub fn classify(bucket: &str, code: Option<&str>, status: Option<u16>, message: &str) -> CloudError {
    let detail = || match code {
        Some(code) => format!("{}: {}", code, message),
        None => message.to_string(),
    };

    if let Some(code) = code {
        match code {
            "BucketAlreadyExists" => return CloudError::BucketNameConflict(bucket.to_string()),
            "BucketNotEmpty" => return CloudError::BucketNotEmpty(bucket.to_string()),
            c if TRANSIENT_CODES.contains(&c) => return CloudError::Transient(detail()),
            c if NOT_FOUND_CODES.contains(&c) => return CloudError::ResourceNotFound(detail()),
            c if AUTH_CODES.contains(&c) => return CloudError::AuthenticationFailed(detail()),
            c if INVALID_CONFIG_CODES.contains(&c) => return CloudError::InvalidConfig(detail()),
            _ => {}
        }
    }

    match status {
        Some(429) | Some(500..=599) => CloudError::Transient(detail()),
        Some(404) => CloudError::ResourceNotFound(detail()),
        _ => CloudError::ApiError(detail()),
    }
}

/// Whether a failed credential check means the credentials themselves are
/// unusable.
///
/// `AccessDenied` is a signed request that was accepted and then refused, so
/// the credentials work; a bare 401/403 without a body is treated as rejected.
pub fn credentials_rejected(code: Option<&str>, status: Option<u16>) -> bool {
    match code {
        Some(code) if AUTH_CODES.contains(&code) => true,
        Some("AccessDenied") => false,
        _ => matches!(status, Some(401) | Some(403)),
    }
}

/// Convert an SDK failure for an operation on `bucket`
pub fn from_sdk_error<E>(bucket: &str, operation: &str, err: SdkError<E>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = format!("{} {}: {}", operation, bucket, DisplayErrorContext(&err));

    match &err {
        SdkError::TimeoutError(_) => CloudError::Timeout(message),
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            CloudError::Transient(message)
        }
        SdkError::ServiceError(context) => classify(
            bucket,
            context.err().code(),
            Some(context.raw().status().as_u16()),
            &message,
        ),
        _ => CloudError::ApiError(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "my-terraform-portfolio-site-12345";

    #[test]
    fn test_throttling_is_transient() {
        let err = classify(BUCKET, Some("SlowDown"), Some(503), "Please reduce your request rate");
        assert!(matches!(err, CloudError::Transient(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_transient_without_code() {
        assert!(classify(BUCKET, None, Some(500), "").is_retryable());
        assert!(classify(BUCKET, None, Some(429), "").is_retryable());
        assert!(!classify(BUCKET, None, Some(400), "").is_retryable());
    }

    #[test]
    fn test_bucket_taken_by_someone_else() {
        let err = classify(BUCKET, Some("BucketAlreadyExists"), Some(409), "taken");
        assert!(matches!(err, CloudError::BucketNameConflict(ref name) if name == BUCKET));
    }

    #[test]
    fn test_missing_configuration_is_not_found() {
        for code in [
            "NoSuchBucketPolicy",
            "NoSuchWebsiteConfiguration",
            "NoSuchPublicAccessBlockConfiguration",
        ] {
            let err = classify(BUCKET, Some(code), Some(404), "missing");
            assert!(matches!(err, CloudError::ResourceNotFound(_)), "{}", code);
        }
        assert!(matches!(
            classify(BUCKET, None, Some(404), ""),
            CloudError::ResourceNotFound(_)
        ));
    }

    #[test]
    fn test_non_empty_bucket() {
        let err = classify(BUCKET, Some("BucketNotEmpty"), Some(409), "");
        assert!(matches!(err, CloudError::BucketNotEmpty(_)));
    }

    #[test]
    fn test_credentials_and_config_errors() {
        assert!(matches!(
            classify(BUCKET, Some("InvalidAccessKeyId"), Some(403), ""),
            CloudError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            classify(BUCKET, Some("MalformedPolicy"), Some(400), ""),
            CloudError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_rejected_credentials() {
        assert!(credentials_rejected(Some("InvalidAccessKeyId"), Some(403)));
        assert!(credentials_rejected(Some("ExpiredToken"), Some(400)));
        // HEAD-style response without a body
        assert!(credentials_rejected(None, Some(403)));

        // Signed and understood, just not allowed to list buckets
        assert!(!credentials_rejected(Some("AccessDenied"), Some(403)));
        assert!(!credentials_rejected(Some("SlowDown"), Some(503)));
        assert!(!credentials_rejected(None, Some(500)));
    }

    #[test]
    fn test_access_denied_is_not_retried() {
        let err = classify(BUCKET, Some("AccessDenied"), Some(403), "no permission");
        assert!(matches!(err, CloudError::ApiError(ref msg) if msg.starts_with("AccessDenied")));
        assert!(!err.is_retryable());
    }
}
