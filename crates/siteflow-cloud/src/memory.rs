//! In-process provider
//!
//! Keeps buckets in memory, records every call, and can be told to fail
//! specific operations. Used to exercise the reconciler without a network.

use crate::action::OperationKind;
use crate::error::{CloudError, Result};
use crate::policy::PolicyDocument;
use crate::provider::{AuthStatus, CloudProvider};
use crate::resource::{
    BucketHandle, BucketPresence, PublicAccessBlockSettings, RemoteState, WebsiteConfig,
    website_endpoint,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Failure to inject into the next matching operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Retryable failure (throttling)
    Transient,
    /// Attempt never completes within any sane timeout
    Hang,
    /// Non-retryable rejection (e.g. access denied)
    Rejected(String),
}

#[derive(Debug, Clone, Default)]
struct MemoryBucket {
    region: String,
    website: Option<WebsiteConfig>,
    policy: Option<serde_json::Value>,
    public_access_block: Option<PublicAccessBlockSettings>,
    objects: u64,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: HashMap<String, MemoryBucket>,
    foreign: HashSet<String>,
    faults: VecDeque<(OperationKind, Fault)>,
    calls: Vec<OperationKind>,
    observations: usize,
    credentials_rejected: bool,
}

/// Provider backed by an in-memory bucket registry
#[derive(Debug, Default)]
pub struct MemoryProvider {
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a bucket name as owned by another account
    pub fn with_foreign_bucket(self, name: impl Into<String>) -> Self {
        self.lock().foreign.insert(name.into());
        self
    }

    /// Make every credential check fail
    pub fn with_rejected_credentials(self) -> Self {
        self.lock().credentials_rejected = true;
        self
    }

    /// Make the next call of `operation` fail with `fault`
    pub fn fail_next(&self, operation: OperationKind, fault: Fault) {
        self.lock().faults.push_back((operation, fault));
    }

    /// Pretend objects were uploaded to the bucket
    pub fn put_objects(&self, bucket: &str, count: u64) {
        if let Some(b) = self.lock().buckets.get_mut(bucket) {
            b.objects += count;
        }
    }

    /// Overwrite the stored policy, simulating an out-of-band change
    pub fn set_raw_policy(&self, bucket: &str, policy: serde_json::Value) {
        if let Some(b) = self.lock().buckets.get_mut(bucket) {
            b.policy = Some(policy);
        }
    }

    /// Mutating calls that reached the provider, in order
    pub fn calls(&self) -> Vec<OperationKind> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: OperationKind) -> usize {
        self.lock().calls.iter().filter(|c| **c == operation).count()
    }

    pub fn observation_count(&self) -> usize {
        self.lock().observations
    }

    pub fn bucket_exists(&self, name: &str) -> bool {
        self.lock().buckets.contains_key(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock only happens in a failing test
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and pop a matching fault, if any
    async fn enter(&self, operation: OperationKind) -> Result<()> {
        let fault = {
            let mut inner = self.lock();
            inner.calls.push(operation);
            let position = inner.faults.iter().position(|(op, _)| *op == operation);
            position.and_then(|p| inner.faults.remove(p)).map(|(_, fault)| fault)
        };

        match fault {
            None => Ok(()),
            Some(Fault::Transient) => Err(CloudError::Transient(format!(
                "{}: SlowDown (injected)",
                operation
            ))),
            Some(Fault::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Some(Fault::Rejected(reason)) => Err(CloudError::ApiError(format!(
                "{}: {}",
                operation, reason
            ))),
        }
    }

    fn with_bucket<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut MemoryBucket) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self.lock();
        match inner.buckets.get_mut(name) {
            Some(bucket) => f(bucket),
            None => Err(CloudError::ResourceNotFound(format!("bucket {}", name))),
        }
    }
}

#[async_trait]
impl CloudProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn display_name(&self) -> &str {
        "In-memory"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        if self.lock().credentials_rejected {
            return Ok(AuthStatus::failed("InvalidAccessKeyId"));
        }
        Ok(AuthStatus::ok("memory"))
    }

    async fn observe(&self, bucket: &str) -> Result<RemoteState> {
        let mut inner = self.lock();
        inner.observations += 1;

        if inner.foreign.contains(bucket) {
            return Ok(RemoteState::foreign());
        }

        Ok(match inner.buckets.get(bucket) {
            None => RemoteState::absent(),
            Some(b) => RemoteState {
                bucket: BucketPresence::Owned {
                    region: Some(b.region.clone()),
                },
                website: b.website.clone(),
                policy: b.policy.clone(),
                public_access_block: b.public_access_block,
            },
        })
    }

    async fn create_bucket(&self, name: &str, region: &str) -> Result<BucketHandle> {
        self.enter(OperationKind::CreateBucket).await?;

        let mut inner = self.lock();
        if inner.foreign.contains(name) {
            return Err(CloudError::BucketNameConflict(name.to_string()));
        }
        inner
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| MemoryBucket {
                region: region.to_string(),
                ..Default::default()
            });

        Ok(BucketHandle {
            name: name.to_string(),
            region: region.to_string(),
        })
    }

    async fn set_website_config(
        &self,
        bucket: &BucketHandle,
        website: &WebsiteConfig,
    ) -> Result<()> {
        self.enter(OperationKind::PutWebsiteConfig).await?;
        self.with_bucket(&bucket.name, |b| {
            b.website = Some(website.clone());
            Ok(())
        })
    }

    async fn put_bucket_policy(
        &self,
        bucket: &BucketHandle,
        policy: &PolicyDocument,
    ) -> Result<()> {
        self.enter(OperationKind::PutBucketPolicy).await?;
        self.with_bucket(&bucket.name, |b| {
            if let Some(block) = b.public_access_block {
                if block.block_public_policy {
                    return Err(CloudError::ApiError(
                        "AccessDenied: public policies are blocked".to_string(),
                    ));
                }
            }
            b.policy = Some(policy.to_value());
            Ok(())
        })
    }

    async fn set_public_access_block(
        &self,
        bucket: &BucketHandle,
        settings: &PublicAccessBlockSettings,
    ) -> Result<()> {
        self.enter(OperationKind::PutPublicAccessBlock).await?;
        self.with_bucket(&bucket.name, |b| {
            b.public_access_block = Some(*settings);
            Ok(())
        })
    }

    async fn get_website_endpoint(&self, bucket: &BucketHandle) -> Result<String> {
        self.with_bucket(&bucket.name, |b| match b.website {
            Some(_) => Ok(website_endpoint(&bucket.name, &b.region)),
            None => Err(CloudError::ResourceNotFound(format!(
                "website configuration for {}",
                bucket.name
            ))),
        })
    }

    async fn delete_bucket_policy(&self, bucket: &BucketHandle) -> Result<()> {
        self.enter(OperationKind::DeleteBucketPolicy).await?;
        self.with_bucket(&bucket.name, |b| {
            b.policy = None;
            Ok(())
        })
    }

    async fn delete_public_access_block(&self, bucket: &BucketHandle) -> Result<()> {
        self.enter(OperationKind::DeletePublicAccessBlock).await?;
        self.with_bucket(&bucket.name, |b| {
            b.public_access_block = None;
            Ok(())
        })
    }

    async fn delete_website_config(&self, bucket: &BucketHandle) -> Result<()> {
        self.enter(OperationKind::DeleteWebsiteConfig).await?;
        self.with_bucket(&bucket.name, |b| {
            b.website = None;
            Ok(())
        })
    }

    async fn empty_bucket(&self, bucket: &BucketHandle) -> Result<u64> {
        self.enter(OperationKind::EmptyBucket).await?;
        self.with_bucket(&bucket.name, |b| Ok(std::mem::take(&mut b.objects)))
    }

    async fn delete_bucket(&self, bucket: &BucketHandle) -> Result<()> {
        self.enter(OperationKind::DeleteBucket).await?;

        let mut inner = self.lock();
        match inner.buckets.get(&bucket.name) {
            None => Err(CloudError::ResourceNotFound(format!("bucket {}", bucket.name))),
            Some(b) if b.objects > 0 => Err(CloudError::BucketNotEmpty(bucket.name.clone())),
            Some(_) => {
                inner.buckets.remove(&bucket.name);
                Ok(())
            }
        }
    }
}
