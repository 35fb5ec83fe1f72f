//! Plan and apply static-site changes
//!
//! `plan` is a pure function of desired and observed state. `apply` executes
//! a plan one operation at a time, in order, stopping at the first failure.
//! Nothing is carried between runs: every run starts by observing the
//! provider again, so an interrupted or partially failed apply is finished
//! simply by running apply again.

use crate::action::{Action, ActionType, ApplyResult, Operation, Plan};
use crate::error::{CloudError, Result};
use crate::provider::{CloudProvider, RetryConfig};
use crate::resource::{BucketHandle, BucketPresence, DesiredState, RemoteState, SiteOutputs};
use crate::retry::with_retry;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Converges remote state towards a [`DesiredState`]
pub struct Reconciler {
    provider: Arc<dyn CloudProvider>,
    retry: RetryConfig,
    operation_timeout: Duration,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self {
            provider,
            retry: RetryConfig::default(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound for every single remote call
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &dyn CloudProvider {
        self.provider.as_ref()
    }

    /// Read the remote state of the desired bucket
    pub async fn observe(&self, desired: &DesiredState) -> Result<RemoteState> {
        let bucket = desired.bucket.name.as_str();
        let state = with_retry(&self.retry, self.operation_timeout, "observe", || {
            self.provider.observe(bucket)
        })
        .await?;
        tracing::debug!(bucket, presence = ?state.bucket, "Observed remote state");
        Ok(state)
    }

    /// Fail with `AuthenticationFailed` unless the provider accepts the
    /// credentials.
    ///
    /// Providers answer "forbidden" both for a bucket owned by someone else
    /// and for unusable credentials, so bucket presence is only trusted after
    /// this check.
    pub async fn verify_auth(&self) -> Result<()> {
        let status = with_retry(&self.retry, self.operation_timeout, "check_auth", || {
            self.provider.check_auth()
        })
        .await?;

        if !status.authenticated {
            let reason = status.error.unwrap_or_else(|| {
                format!("{} rejected the credentials", self.provider.display_name())
            });
            return Err(CloudError::AuthenticationFailed(reason));
        }
        tracing::debug!(account = ?status.account_info, "Credentials accepted");
        Ok(())
    }

    /// Check credentials, observe, then plan
    pub async fn refresh_plan(&self, desired: &DesiredState) -> Result<Plan> {
        self.verify_auth().await?;
        let observed = self.observe(desired).await?;
        plan(desired, &observed)
    }

    /// Check credentials, observe, then plan the teardown
    pub async fn refresh_destroy_plan(&self, desired: &DesiredState) -> Result<Plan> {
        self.verify_auth().await?;
        let observed = self.observe(desired).await?;
        Ok(plan_destroy(desired, &observed))
    }

    /// Execute every changing action of `plan` in order.
    ///
    /// A plan without changes performs no remote calls at all.
    pub async fn apply(&self, plan: &Plan) -> Result<ApplyResult> {
        let start = Instant::now();
        let mut result = ApplyResult::new();
        result.unchanged = plan.actions.len() - plan.changes().count();

        for action in plan.changes() {
            tracing::info!(
                action = %action.id,
                operation = %action.operation.kind(),
                bucket = action.operation.bucket(),
                "Applying"
            );

            match self.execute(&action.operation).await {
                Ok(message) => result.add_success(action, message),
                Err(e) => {
                    tracing::error!(action = %action.id, error = %e, "Apply stopped");
                    if result.applied.is_empty() {
                        return Err(e);
                    }
                    return Err(CloudError::PartialApply {
                        completed: result.completed_operations(),
                        failed: action.operation.kind(),
                        source: Box::new(e),
                    });
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            operations = result.operation_count(),
            unchanged = result.unchanged,
            duration_ms = result.duration_ms,
            "Apply finished"
        );
        Ok(result)
    }

    /// Plan the teardown and execute it
    pub async fn destroy(&self, desired: &DesiredState) -> Result<ApplyResult> {
        let plan = self.refresh_destroy_plan(desired).await?;
        self.apply(&plan).await
    }

    /// Outputs of a converged site.
    ///
    /// Fails with `NotReady` until the bucket exists and website hosting is
    /// configured.
    pub async fn output(&self, desired: &DesiredState) -> Result<SiteOutputs> {
        self.verify_auth().await?;
        let observed = self.observe(desired).await?;
        let bucket = &desired.bucket;

        if observed.bucket == BucketPresence::Foreign {
            return Err(CloudError::BucketNameConflict(bucket.name.clone()));
        }
        if !observed.is_owned() {
            return Err(CloudError::NotReady(format!(
                "bucket '{}' has not been created yet",
                bucket.name
            )));
        }
        if observed.website.is_none() {
            return Err(CloudError::NotReady(format!(
                "website hosting is not configured on '{}' yet",
                bucket.name
            )));
        }

        let handle = bucket.handle();
        let endpoint = with_retry(
            &self.retry,
            self.operation_timeout,
            "get_website_endpoint",
            || self.provider.get_website_endpoint(&handle),
        )
        .await
        .map_err(|e| match e {
            CloudError::ResourceNotFound(what) => CloudError::NotReady(what),
            other => other,
        })?;

        Ok(SiteOutputs::new(bucket, endpoint))
    }

    async fn execute(&self, operation: &Operation) -> Result<String> {
        let label = operation.kind().to_string();
        let retry = &self.retry;
        let timeout = self.operation_timeout;
        let provider = &self.provider;

        match operation {
            Operation::CreateBucket { bucket, region } => {
                let handle = with_retry(retry, timeout, &label, || {
                    provider.create_bucket(bucket, region)
                })
                .await?;
                Ok(format!("created bucket {} in {}", handle.name, handle.region))
            }
            Operation::PutWebsiteConfig { bucket, website } => {
                let handle = handle_for(bucket);
                with_retry(retry, timeout, &label, || {
                    provider.set_website_config(&handle, website)
                })
                .await?;
                Ok(format!(
                    "website hosting enabled (index: {})",
                    website.index_document
                ))
            }
            Operation::PutPublicAccessBlock { bucket, settings } => {
                let handle = handle_for(bucket);
                with_retry(retry, timeout, &label, || {
                    provider.set_public_access_block(&handle, settings)
                })
                .await?;
                Ok("public access block settings written".to_string())
            }
            Operation::PutBucketPolicy { bucket, policy } => {
                let handle = handle_for(bucket);
                with_retry(retry, timeout, &label, || {
                    provider.put_bucket_policy(&handle, policy)
                })
                .await?;
                Ok("public-read policy attached".to_string())
            }
            Operation::DeleteBucketPolicy { bucket } => {
                let handle = handle_for(bucket);
                with_retry(retry, timeout, &label, || {
                    provider.delete_bucket_policy(&handle)
                })
                .await?;
                Ok("bucket policy removed".to_string())
            }
            Operation::DeletePublicAccessBlock { bucket } => {
                let handle = handle_for(bucket);
                with_retry(retry, timeout, &label, || {
                    provider.delete_public_access_block(&handle)
                })
                .await?;
                Ok("public access block settings removed".to_string())
            }
            Operation::DeleteWebsiteConfig { bucket } => {
                let handle = handle_for(bucket);
                with_retry(retry, timeout, &label, || {
                    provider.delete_website_config(&handle)
                })
                .await?;
                Ok("website hosting disabled".to_string())
            }
            Operation::EmptyBucket { bucket } => {
                let handle = handle_for(bucket);
                let removed =
                    with_retry(retry, timeout, &label, || provider.empty_bucket(&handle)).await?;
                Ok(format!("removed {} object(s)", removed))
            }
            Operation::DeleteBucket { bucket } => {
                let handle = handle_for(bucket);
                with_retry(retry, timeout, &label, || provider.delete_bucket(&handle)).await?;
                Ok(format!("deleted bucket {}", bucket))
            }
        }
    }
}

/// The region is irrelevant for calls addressed to an existing bucket
fn handle_for(bucket: &str) -> BucketHandle {
    BucketHandle {
        name: bucket.to_string(),
        region: String::new(),
    }
}

/// Diff desired against observed state.
///
/// Emits one action per resource in dependency order: bucket, website
/// hosting, public access block, bucket policy. The access block precedes
/// the policy because providers reject a public policy while
/// `BlockPublicPolicy` is on.
pub fn plan(desired: &DesiredState, observed: &RemoteState) -> Result<Plan> {
    let bucket = &desired.bucket;
    let name = bucket.name.clone();
    let mut actions = Vec::with_capacity(4);

    let bucket_exists = match &observed.bucket {
        BucketPresence::Foreign => {
            return Err(CloudError::BucketNameConflict(name));
        }
        BucketPresence::Owned {
            region: Some(region),
        } if region != &bucket.region => {
            return Err(CloudError::InvalidConfig(format!(
                "bucket '{}' already exists in {} but {} is configured; \
                 a bucket's region cannot be changed",
                name, region, bucket.region
            )));
        }
        BucketPresence::Owned { .. } => true,
        BucketPresence::Absent => false,
    };

    let create_bucket = Operation::CreateBucket {
        bucket: name.clone(),
        region: bucket.region.clone(),
    };
    actions.push(if bucket_exists {
        Action::new(
            ActionType::NoOp,
            create_bucket,
            format!("bucket {} already exists", name),
        )
    } else {
        Action::new(
            ActionType::Create,
            create_bucket,
            format!("create bucket {} in {}", name, bucket.region),
        )
    });

    // Everything below is absent when the bucket is
    let observed_website = observed.website.as_ref().filter(|_| bucket_exists);
    let website_action = match observed_website {
        Some(current) if current == &bucket.website => ActionType::NoOp,
        Some(_) => ActionType::Update,
        None => ActionType::Create,
    };
    actions.push(Action::new(
        website_action,
        Operation::PutWebsiteConfig {
            bucket: name.clone(),
            website: bucket.website.clone(),
        },
        match website_action {
            ActionType::NoOp => "website hosting is up to date".to_string(),
            _ => format!(
                "serve {} as index document",
                bucket.website.index_document
            ),
        },
    ));

    let observed_block = observed.public_access_block.filter(|_| bucket_exists);
    let block_action = match observed_block {
        Some(current) if current == desired.public_access_block => ActionType::NoOp,
        Some(_) => ActionType::Update,
        None => ActionType::Create,
    };
    actions.push(Action::new(
        block_action,
        Operation::PutPublicAccessBlock {
            bucket: name.clone(),
            settings: desired.public_access_block,
        },
        match block_action {
            ActionType::NoOp => "public access block is up to date".to_string(),
            _ => "set public access block flags".to_string(),
        },
    ));

    let document = desired.policy.document();
    let observed_policy = observed.policy.as_ref().filter(|_| bucket_exists);
    let policy_action = match observed_policy {
        Some(current) if document.is_equivalent(current) => ActionType::NoOp,
        Some(_) => ActionType::Update,
        None => ActionType::Create,
    };
    actions.push(Action::new(
        policy_action,
        Operation::PutBucketPolicy {
            bucket: name.clone(),
            policy: document,
        },
        match policy_action {
            ActionType::NoOp => "public-read policy is up to date".to_string(),
            _ => format!(
                "grant public read on {}",
                desired.policy.resource_pattern()
            ),
        },
    ));

    let plan = Plan::new(actions);
    tracing::debug!(bucket = %name, summary = %plan.summary(), "Planned");
    Ok(plan)
}

/// Teardown plan: bucket configuration first, the bucket last.
///
/// A bucket that does not exist, or belongs to someone else, yields an empty
/// plan.
pub fn plan_destroy(desired: &DesiredState, observed: &RemoteState) -> Plan {
    if !observed.is_owned() {
        return Plan::empty();
    }

    let bucket = desired.bucket.name.clone();
    let mut actions = Vec::new();

    if observed.policy.is_some() {
        actions.push(Action::new(
            ActionType::Delete,
            Operation::DeleteBucketPolicy {
                bucket: bucket.clone(),
            },
            "remove public-read policy",
        ));
    }
    if observed.public_access_block.is_some() {
        actions.push(Action::new(
            ActionType::Delete,
            Operation::DeletePublicAccessBlock {
                bucket: bucket.clone(),
            },
            "remove public access block settings",
        ));
    }
    if observed.website.is_some() {
        actions.push(Action::new(
            ActionType::Delete,
            Operation::DeleteWebsiteConfig {
                bucket: bucket.clone(),
            },
            "disable website hosting",
        ));
    }
    if desired.force_destroy {
        actions.push(Action::new(
            ActionType::Delete,
            Operation::EmptyBucket {
                bucket: bucket.clone(),
            },
            "delete all objects",
        ));
    }
    actions.push(Action::new(
        ActionType::Delete,
        Operation::DeleteBucket {
            bucket: bucket.clone(),
        },
        format!("delete bucket {}", bucket),
    ));

    Plan::new(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::OperationKind;
    use crate::resource::{BucketSpec, PublicAccessBlockSettings, WebsiteConfig};

    fn desired() -> DesiredState {
        DesiredState::new(
            BucketSpec::new(
                "my-terraform-portfolio-site-12345",
                "us-east-1",
                WebsiteConfig::default(),
            )
            .unwrap(),
        )
    }

    fn converged(desired: &DesiredState) -> RemoteState {
        RemoteState {
            bucket: BucketPresence::Owned {
                region: Some("us-east-1".to_string()),
            },
            website: Some(desired.bucket.website.clone()),
            policy: Some(desired.policy.document().to_value()),
            public_access_block: Some(desired.public_access_block),
        }
    }

    fn kinds(plan: &Plan) -> Vec<OperationKind> {
        plan.changes().map(|a| a.operation.kind()).collect()
    }

    #[test]
    fn test_plan_from_scratch_is_ordered() {
        let plan = plan(&desired(), &RemoteState::absent()).unwrap();

        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::CreateBucket,
                OperationKind::PutWebsiteConfig,
                OperationKind::PutPublicAccessBlock,
                OperationKind::PutBucketPolicy,
            ]
        );
        let position = |kind| {
            plan.changes()
                .position(|a| a.operation.kind() == kind)
                .unwrap()
        };
        let create = position(OperationKind::CreateBucket);
        assert!(position(OperationKind::PutBucketPolicy) > create);
        assert!(position(OperationKind::PutPublicAccessBlock) > create);
        assert_eq!(plan.summary().create, 4);
    }

    #[test]
    fn test_plan_converged_is_noop() {
        let desired = desired();
        let plan = plan(&desired, &converged(&desired)).unwrap();

        assert!(!plan.has_changes);
        assert_eq!(plan.summary().no_change, 4);
    }

    #[test]
    fn test_plan_is_per_resource() {
        let desired = desired();
        let mut observed = converged(&desired);
        observed.policy = None;

        let plan = plan(&desired, &observed).unwrap();
        assert_eq!(kinds(&plan), vec![OperationKind::PutBucketPolicy]);
        assert_eq!(plan.actions_by_type(ActionType::Create).len(), 1);
    }

    #[test]
    fn test_plan_updates_drifted_resources() {
        let desired = desired();
        let mut observed = converged(&desired);
        observed.website = Some(WebsiteConfig::new("home.html"));
        observed.public_access_block = Some(PublicAccessBlockSettings {
            block_public_policy: true,
            ..Default::default()
        });

        let plan = plan(&desired, &observed).unwrap();
        assert_eq!(plan.summary().update, 2);
        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::PutWebsiteConfig,
                OperationKind::PutPublicAccessBlock
            ]
        );
    }

    #[test]
    fn test_plan_ignores_leftovers_without_bucket() {
        // A stale snapshot claiming config exists on a missing bucket
        let desired = desired();
        let mut observed = converged(&desired);
        observed.bucket = BucketPresence::Absent;

        let plan = plan(&desired, &observed).unwrap();
        assert_eq!(plan.summary().create, 4);
    }

    #[test]
    fn test_plan_foreign_bucket_is_conflict() {
        let err = plan(&desired(), &RemoteState::foreign()).unwrap_err();
        assert!(matches!(err, CloudError::BucketNameConflict(_)));
    }

    #[test]
    fn test_plan_region_change_is_rejected() {
        let desired = desired();
        let mut observed = converged(&desired);
        observed.bucket = BucketPresence::Owned {
            region: Some("eu-west-1".to_string()),
        };

        let err = plan(&desired, &observed).unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }

    #[test]
    fn test_plan_unknown_region_is_accepted() {
        let desired = desired();
        let mut observed = converged(&desired);
        observed.bucket = BucketPresence::Owned { region: None };

        assert!(!plan(&desired, &observed).unwrap().has_changes);
    }

    #[test]
    fn test_destroy_removes_config_before_bucket() {
        let desired = desired().with_force_destroy(true);
        let plan = plan_destroy(&desired, &converged(&desired));

        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::DeleteBucketPolicy,
                OperationKind::DeletePublicAccessBlock,
                OperationKind::DeleteWebsiteConfig,
                OperationKind::EmptyBucket,
                OperationKind::DeleteBucket,
            ]
        );
    }

    #[test]
    fn test_destroy_skips_missing_resources() {
        let desired = desired();
        let mut observed = converged(&desired);
        observed.policy = None;
        observed.website = None;

        let plan = plan_destroy(&desired, &observed);
        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::DeletePublicAccessBlock,
                OperationKind::DeleteBucket
            ]
        );
    }

    #[test]
    fn test_destroy_absent_or_foreign_is_empty() {
        assert!(!plan_destroy(&desired(), &RemoteState::absent()).has_changes);
        assert!(!plan_destroy(&desired(), &RemoteState::foreign()).has_changes);
    }
}
