//! AWS S3 provider implementation

use crate::config::{AwsConfig, build_s3_client};
use crate::error::{classify, credentials_rejected, from_sdk_error};
use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ErrorDocument, IndexDocument,
    ObjectIdentifier, PublicAccessBlockConfiguration, WebsiteConfiguration,
};
use siteflow_cloud::{
    AuthStatus, BucketHandle, BucketPresence, CloudError, CloudProvider, PolicyDocument,
    PublicAccessBlockSettings, RemoteState, Result, WebsiteConfig, website_endpoint,
};
use tracing::{debug, info, instrument};

/// Largest batch accepted by `DeleteObjects`
const DELETE_BATCH: i32 = 1000;

/// S3 static website provider
pub struct AwsS3Provider {
    config: AwsConfig,
    client: aws_sdk_s3::Client,
}

impl std::fmt::Debug for AwsS3Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsS3Provider")
            .field("config", &self.config)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl AwsS3Provider {
    /// Resolve credentials and build the S3 client
    pub async fn new(config: AwsConfig) -> Self {
        let client = build_s3_client(&config).await;
        Self { config, client }
    }

    /// Use a pre-built client
    pub fn with_client(config: AwsConfig, client: aws_sdk_s3::Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &AwsConfig {
        &self.config
    }

    fn region_for<'a>(&'a self, bucket: &'a BucketHandle) -> &'a str {
        if bucket.region.is_empty() {
            &self.config.region
        } else {
            &bucket.region
        }
    }

    /// HeadBucket tells apart missing, someone else's, and ours.
    ///
    /// A 403 is only taken as "someone else's" because credentials are
    /// checked before observing.
    async fn bucket_presence(&self, bucket: &str) -> Result<BucketPresence> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(output) => Ok(BucketPresence::Owned {
                region: output.bucket_region().map(str::to_string),
            }),
            Err(SdkError::ServiceError(context)) => {
                let raw = context.raw();
                let status = raw.status().as_u16();
                let region = raw.headers().get("x-amz-bucket-region");
                match presence_for_status(status, region) {
                    Some(presence) => Ok(presence),
                    None => Err(classify(
                        bucket,
                        context.err().code(),
                        Some(status),
                        &format!("HeadBucket {}: {}", bucket, DisplayErrorContext(context.err())),
                    )),
                }
            }
            Err(err) => Err(from_sdk_error(bucket, "HeadBucket", err)),
        }
    }

    async fn read_website(&self, bucket: &str) -> Result<WebsiteConfig> {
        let output = self
            .client
            .get_bucket_website()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| from_sdk_error(bucket, "GetBucketWebsite", e))?;

        let index_document = output
            .index_document()
            .map(|d| d.suffix().to_string())
            .unwrap_or_default();
        let error_document = output.error_document().map(|d| d.key().to_string());

        Ok(WebsiteConfig {
            index_document,
            error_document,
        })
    }

    async fn read_policy(&self, bucket: &str) -> Result<serde_json::Value> {
        let output = self
            .client
            .get_bucket_policy()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| from_sdk_error(bucket, "GetBucketPolicy", e))?;

        match output.policy() {
            Some(policy) => Ok(serde_json::from_str(policy)?),
            None => Err(CloudError::ResourceNotFound(format!(
                "bucket policy for {}",
                bucket
            ))),
        }
    }

    async fn read_public_access_block(&self, bucket: &str) -> Result<PublicAccessBlockSettings> {
        let output = self
            .client
            .get_public_access_block()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| from_sdk_error(bucket, "GetPublicAccessBlock", e))?;

        let config = output.public_access_block_configuration().ok_or_else(|| {
            CloudError::ResourceNotFound(format!("public access block for {}", bucket))
        })?;

        Ok(PublicAccessBlockSettings {
            block_public_acls: config.block_public_acls().unwrap_or(false),
            ignore_public_acls: config.ignore_public_acls().unwrap_or(false),
            block_public_policy: config.block_public_policy().unwrap_or(false),
            restrict_public_buckets: config.restrict_public_buckets().unwrap_or(false),
        })
    }
}

/// Missing configuration is a normal observation, not a failure
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CloudError::ResourceNotFound(what)) => {
            debug!(what = %what, "Not configured");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Deleting configuration that is already gone counts as done
fn already_gone(result: Result<()>) -> Result<()> {
    optional(result).map(|_| ())
}

fn build_error(what: &str, err: aws_sdk_s3::error::BuildError) -> CloudError {
    CloudError::InvalidConfig(format!("{}: {}", what, err))
}

/// Presence implied by a failed HeadBucket status, when the status settles it
fn presence_for_status(status: u16, region_header: Option<&str>) -> Option<BucketPresence> {
    match status {
        404 => Some(BucketPresence::Absent),
        403 => Some(BucketPresence::Foreign),
        // Exists in a region other than the client's
        301 => Some(BucketPresence::Owned {
            region: region_header.map(str::to_string),
        }),
        _ => None,
    }
}

#[async_trait]
impl CloudProvider for AwsS3Provider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "AWS S3"
    }

    #[instrument(skip(self), fields(provider = "aws"))]
    async fn check_auth(&self) -> Result<AuthStatus> {
        let identity = match &self.config.profile {
            Some(profile) => format!("profile {} ({})", profile, self.config.region),
            None => format!("default credentials ({})", self.config.region),
        };

        match self.client.list_buckets().max_buckets(1).send().await {
            Ok(_) => Ok(AuthStatus::ok(identity)),
            Err(err) => {
                let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
                let status = match &err {
                    SdkError::ServiceError(context) => Some(context.raw().status().as_u16()),
                    _ => None,
                };

                if credentials_rejected(code.as_deref(), status) {
                    Ok(AuthStatus::failed(format!(
                        "ListBuckets: {}",
                        DisplayErrorContext(&err)
                    )))
                } else if code.as_deref() == Some("AccessDenied") {
                    debug!("Credentials accepted; ListBuckets is not permitted");
                    Ok(AuthStatus::ok(identity))
                } else {
                    Err(from_sdk_error("*", "ListBuckets", err))
                }
            }
        }
    }

    #[instrument(skip(self), fields(provider = "aws"))]
    async fn observe(&self, bucket: &str) -> Result<RemoteState> {
        let presence = self.bucket_presence(bucket).await?;

        let readable = match &presence {
            BucketPresence::Owned { region: Some(region) } => region == &self.config.region,
            BucketPresence::Owned { region: None } => true,
            BucketPresence::Absent | BucketPresence::Foreign => false,
        };
        if !readable {
            return Ok(RemoteState {
                bucket: presence,
                ..RemoteState::absent()
            });
        }

        let website = optional(self.read_website(bucket).await)?;
        let policy = optional(self.read_policy(bucket).await)?;
        let public_access_block = optional(self.read_public_access_block(bucket).await)?;

        Ok(RemoteState {
            bucket: presence,
            website,
            policy,
            public_access_block,
        })
    }

    #[instrument(skip(self), fields(provider = "aws"))]
    async fn create_bucket(&self, name: &str, region: &str) -> Result<BucketHandle> {
        let mut request = self.client.create_bucket().bucket(name);

        // us-east-1 rejects an explicit location constraint
        if region != "us-east-1" {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        match request.send().await {
            Ok(_) => info!(bucket = name, region, "Bucket created"),
            Err(err) if err.code() == Some("BucketAlreadyOwnedByYou") => {
                debug!(bucket = name, "Bucket already owned by this account");
            }
            Err(err) => return Err(from_sdk_error(name, "CreateBucket", err)),
        }

        Ok(BucketHandle {
            name: name.to_string(),
            region: region.to_string(),
        })
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn set_website_config(
        &self,
        bucket: &BucketHandle,
        website: &WebsiteConfig,
    ) -> Result<()> {
        let index = IndexDocument::builder()
            .suffix(&website.index_document)
            .build()
            .map_err(|e| build_error("index document", e))?;

        let mut configuration = WebsiteConfiguration::builder().index_document(index);
        if let Some(key) = &website.error_document {
            let error = ErrorDocument::builder()
                .key(key)
                .build()
                .map_err(|e| build_error("error document", e))?;
            configuration = configuration.error_document(error);
        }

        self.client
            .put_bucket_website()
            .bucket(&bucket.name)
            .website_configuration(configuration.build())
            .send()
            .await
            .map_err(|e| from_sdk_error(&bucket.name, "PutBucketWebsite", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn put_bucket_policy(
        &self,
        bucket: &BucketHandle,
        policy: &PolicyDocument,
    ) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(&bucket.name)
            .policy(policy.to_json()?)
            .send()
            .await
            .map_err(|e| from_sdk_error(&bucket.name, "PutBucketPolicy", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn set_public_access_block(
        &self,
        bucket: &BucketHandle,
        settings: &PublicAccessBlockSettings,
    ) -> Result<()> {
        let configuration = PublicAccessBlockConfiguration::builder()
            .block_public_acls(settings.block_public_acls)
            .ignore_public_acls(settings.ignore_public_acls)
            .block_public_policy(settings.block_public_policy)
            .restrict_public_buckets(settings.restrict_public_buckets)
            .build();

        self.client
            .put_public_access_block()
            .bucket(&bucket.name)
            .public_access_block_configuration(configuration)
            .send()
            .await
            .map_err(|e| from_sdk_error(&bucket.name, "PutPublicAccessBlock", e))?;
        Ok(())
    }

    async fn get_website_endpoint(&self, bucket: &BucketHandle) -> Result<String> {
        // Only report an endpoint that actually serves
        self.read_website(&bucket.name).await?;
        Ok(website_endpoint(&bucket.name, self.region_for(bucket)))
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn delete_bucket_policy(&self, bucket: &BucketHandle) -> Result<()> {
        already_gone(
            self.client
                .delete_bucket_policy()
                .bucket(&bucket.name)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| from_sdk_error(&bucket.name, "DeleteBucketPolicy", e)),
        )
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn delete_public_access_block(&self, bucket: &BucketHandle) -> Result<()> {
        already_gone(
            self.client
                .delete_public_access_block()
                .bucket(&bucket.name)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| from_sdk_error(&bucket.name, "DeletePublicAccessBlock", e)),
        )
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn delete_website_config(&self, bucket: &BucketHandle) -> Result<()> {
        already_gone(
            self.client
                .delete_bucket_website()
                .bucket(&bucket.name)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| from_sdk_error(&bucket.name, "DeleteBucketWebsite", e)),
        )
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn empty_bucket(&self, bucket: &BucketHandle) -> Result<u64> {
        let mut removed = 0u64;

        // Versions cover unversioned objects too (version id "null")
        loop {
            let listing = self
                .client
                .list_object_versions()
                .bucket(&bucket.name)
                .max_keys(DELETE_BATCH)
                .send()
                .await
                .map_err(|e| from_sdk_error(&bucket.name, "ListObjectVersions", e))?;

            let versions = listing
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()));
            let markers = listing
                .delete_markers()
                .iter()
                .map(|m| (m.key(), m.version_id()));

            let mut objects = Vec::new();
            for (key, version_id) in versions.chain(markers) {
                let Some(key) = key else { continue };
                let identifier = ObjectIdentifier::builder()
                    .key(key)
                    .set_version_id(version_id.map(str::to_string))
                    .build()
                    .map_err(|e| build_error("object identifier", e))?;
                objects.push(identifier);
            }

            if objects.is_empty() {
                break;
            }

            let batch = objects.len() as u64;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| build_error("delete request", e))?;

            let output = self
                .client
                .delete_objects()
                .bucket(&bucket.name)
                .delete(delete)
                .send()
                .await
                .map_err(|e| from_sdk_error(&bucket.name, "DeleteObjects", e))?;

            if let Some(failure) = output.errors().first() {
                return Err(CloudError::ApiError(format!(
                    "DeleteObjects {}: {} ({})",
                    bucket.name,
                    failure.key().unwrap_or("?"),
                    failure.code().unwrap_or("unknown error")
                )));
            }

            removed += batch;
            debug!(bucket = %bucket.name, removed, "Deleted object batch");
        }

        info!(bucket = %bucket.name, removed, "Bucket emptied");
        Ok(removed)
    }

    #[instrument(skip_all, fields(provider = "aws", bucket = %bucket.name))]
    async fn delete_bucket(&self, bucket: &BucketHandle) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(&bucket.name)
            .send()
            .await
            .map_err(|e| from_sdk_error(&bucket.name, "DeleteBucket", e))?;
        info!(bucket = %bucket.name, "Bucket deleted");
        Ok(())
    }
}
