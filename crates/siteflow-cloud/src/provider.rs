//! Cloud provider trait definition

use crate::error::Result;
use crate::policy::PolicyDocument;
use crate::resource::{BucketHandle, PublicAccessBlockSettings, RemoteState, WebsiteConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Storage provider abstraction trait
///
/// This is the whole surface the reconciler needs from a provider. Every
/// method is a single remote call (or a small fixed sequence of them) so the
/// reconciler can bound each one with a timeout and retry it.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Read the current remote state of everything belonging to `bucket`
    async fn observe(&self, bucket: &str) -> Result<RemoteState>;

    /// Create the bucket. Fails with `BucketNameConflict` when the name is
    /// taken by someone else; succeeds when the caller already owns it.
    async fn create_bucket(&self, name: &str, region: &str) -> Result<BucketHandle>;

    async fn set_website_config(&self, bucket: &BucketHandle, website: &WebsiteConfig)
    -> Result<()>;

    async fn put_bucket_policy(&self, bucket: &BucketHandle, policy: &PolicyDocument)
    -> Result<()>;

    async fn set_public_access_block(
        &self,
        bucket: &BucketHandle,
        settings: &PublicAccessBlockSettings,
    ) -> Result<()>;

    /// Website endpoint hostname; `ResourceNotFound` when hosting is off
    async fn get_website_endpoint(&self, bucket: &BucketHandle) -> Result<String>;

    async fn delete_bucket_policy(&self, bucket: &BucketHandle) -> Result<()>;

    async fn delete_public_access_block(&self, bucket: &BucketHandle) -> Result<()>;

    async fn delete_website_config(&self, bucket: &BucketHandle) -> Result<()>;

    /// Delete every object in the bucket, returning how many were removed
    async fn empty_bucket(&self, bucket: &BucketHandle) -> Result<u64>;

    /// Delete the (empty) bucket
    async fn delete_bucket(&self, bucket: &BucketHandle) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay)
        }
    }
}
