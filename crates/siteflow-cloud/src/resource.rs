//! Desired and observed resource model
//!
//! A static site is one bucket plus three pieces of bucket configuration
//! (website hosting, public-read policy, public-access-block settings).
//! None of them has an independent lifetime: everything is derived from the
//! [`BucketSpec`].

use crate::error::{CloudError, Result};
use crate::naming::{validate_bucket_name, validate_region};
use crate::policy::PolicyDocument;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";

/// Regions whose website endpoints use the `s3-website-<region>` form.
const LEGACY_WEBSITE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
    "us-gov-west-1",
];

/// Website hosting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteConfig {
    /// Document served for directory requests (e.g. `index.html`)
    pub index_document: String,

    /// Document served on 4xx errors
    pub error_document: Option<String>,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            index_document: DEFAULT_INDEX_DOCUMENT.to_string(),
            error_document: None,
        }
    }
}

impl WebsiteConfig {
    pub fn new(index_document: impl Into<String>) -> Self {
        Self {
            index_document: index_document.into(),
            error_document: None,
        }
    }

    pub fn with_error_document(mut self, error_document: impl Into<String>) -> Self {
        self.error_document = Some(error_document.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.index_document.is_empty() {
            return Err(CloudError::InvalidConfig(
                "index document must not be empty".to_string(),
            ));
        }
        // S3 rejects suffixes containing a slash
        if self.index_document.contains('/') {
            return Err(CloudError::InvalidConfig(format!(
                "index document '{}' must not contain '/'",
                self.index_document
            )));
        }
        if matches!(self.error_document.as_deref(), Some("")) {
            return Err(CloudError::InvalidConfig(
                "error document must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The bucket hosting the site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    /// Globally unique bucket name
    pub name: String,

    /// Region the bucket lives in
    pub region: String,

    pub website: WebsiteConfig,
}

impl BucketSpec {
    /// Build a validated bucket spec.
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        website: WebsiteConfig,
    ) -> Result<Self> {
        let spec = Self {
            name: name.into(),
            region: region.into(),
            website,
        };
        validate_bucket_name(&spec.name)?;
        validate_region(&spec.region)?;
        spec.website.validate()?;
        Ok(spec)
    }

    /// ARN partition for the bucket's region
    pub fn partition(&self) -> &'static str {
        partition_for(&self.region)
    }

    /// Bucket ARN, e.g. `arn:aws:s3:::my-site`
    pub fn arn(&self) -> String {
        format!("arn:{}:s3:::{}", self.partition(), self.name)
    }

    /// Hostname the bucket is served from once website hosting is enabled
    pub fn website_endpoint(&self) -> String {
        website_endpoint(&self.name, &self.region)
    }

    pub fn handle(&self) -> BucketHandle {
        BucketHandle {
            name: self.name.clone(),
            region: self.region.clone(),
        }
    }
}

/// Anonymous read access to every object of a bucket.
///
/// Only constructible from a [`BucketSpec`], so the resource pattern always
/// tracks the bucket it protects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessPolicy {
    bucket: String,
    bucket_arn: String,
}

impl PublicAccessPolicy {
    pub const EFFECT: &'static str = "Allow";
    pub const PRINCIPAL: &'static str = "*";
    pub const ACTIONS: &'static [&'static str] = &["s3:GetObject"];

    pub fn for_bucket(bucket: &BucketSpec) -> Self {
        Self {
            bucket: bucket.name.clone(),
            bucket_arn: bucket.arn(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `<bucketArn>/*`
    pub fn resource_pattern(&self) -> String {
        format!("{}/*", self.bucket_arn)
    }

    pub fn document(&self) -> PolicyDocument {
        PolicyDocument::single_statement(
            Self::EFFECT,
            Self::PRINCIPAL,
            Self::ACTIONS.iter().map(|a| a.to_string()).collect(),
            vec![self.resource_pattern()],
        )
    }
}

/// Bucket-level public access block flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessBlockSettings {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlockSettings {
    /// All four protections off, required for a public-read policy to work.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether a public bucket policy can take effect under these settings
    pub fn allows_public_policy(&self) -> bool {
        !self.block_public_policy && !self.restrict_public_buckets
    }
}

/// Everything the reconciler converges towards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub bucket: BucketSpec,
    pub policy: PublicAccessPolicy,
    pub public_access_block: PublicAccessBlockSettings,

    /// Delete remaining objects when destroying the bucket
    pub force_destroy: bool,
}

impl DesiredState {
    pub fn new(bucket: BucketSpec) -> Self {
        let policy = PublicAccessPolicy::for_bucket(&bucket);
        Self {
            bucket,
            policy,
            public_access_block: PublicAccessBlockSettings::disabled(),
            force_destroy: false,
        }
    }

    pub fn with_public_access_block(mut self, settings: PublicAccessBlockSettings) -> Self {
        if !settings.allows_public_policy() {
            tracing::warn!(
                bucket = %self.bucket.name,
                "public access block settings will override the public-read policy"
            );
        }
        self.public_access_block = settings;
        self
    }

    pub fn with_force_destroy(mut self, force_destroy: bool) -> Self {
        self.force_destroy = force_destroy;
        self
    }
}

/// Reference to a bucket known to exist remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketHandle {
    pub name: String,
    pub region: String,
}

/// Whether the bucket name is taken, and by whom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum BucketPresence {
    /// No bucket with this name exists
    Absent,
    /// The bucket exists and is accessible to the caller
    Owned { region: Option<String> },
    /// The name is taken by someone else
    Foreign,
}

/// Snapshot of the remote resources for one bucket name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    pub bucket: BucketPresence,
    pub website: Option<WebsiteConfig>,
    /// Policy as returned by the provider, parsed but not normalised
    pub policy: Option<serde_json::Value>,
    pub public_access_block: Option<PublicAccessBlockSettings>,
}

impl RemoteState {
    /// Nothing exists
    pub fn absent() -> Self {
        Self {
            bucket: BucketPresence::Absent,
            website: None,
            policy: None,
            public_access_block: None,
        }
    }

    /// The name belongs to another account
    pub fn foreign() -> Self {
        Self {
            bucket: BucketPresence::Foreign,
            ..Self::absent()
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.bucket, BucketPresence::Owned { .. })
    }
}

/// Values reported after a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOutputs {
    pub bucket_name: String,
    pub bucket_arn: String,
    pub region: String,
    pub website_endpoint: String,
    pub website_url: String,
}

impl SiteOutputs {
    pub const NAMES: &'static [&'static str] = &[
        "bucket_name",
        "bucket_arn",
        "region",
        "website_endpoint",
        "website_url",
    ];

    pub fn new(bucket: &BucketSpec, website_endpoint: impl Into<String>) -> Self {
        let website_endpoint = website_endpoint.into();
        Self {
            bucket_name: bucket.name.clone(),
            bucket_arn: bucket.arn(),
            region: bucket.region.clone(),
            website_url: format!("http://{}", website_endpoint),
            website_endpoint,
        }
    }

    /// Look up a single output by name
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "bucket_name" => Some(&self.bucket_name),
            "bucket_arn" => Some(&self.bucket_arn),
            "region" => Some(&self.region),
            "website_endpoint" => Some(&self.website_endpoint),
            "website_url" => Some(&self.website_url),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        Self::NAMES
            .iter()
            .filter_map(|name| self.get(name).map(|value| (*name, value)))
    }
}

/// ARN partition for a region
pub fn partition_for(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else {
        "aws"
    }
}

/// Website endpoint hostname for a bucket in a region.
pub fn website_endpoint(bucket: &str, region: &str) -> String {
    let domain = if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    };

    if LEGACY_WEBSITE_REGIONS.contains(&region) {
        format!("{}.s3-website-{}.{}", bucket, region, domain)
    } else {
        format!("{}.s3-website.{}.{}", bucket, region, domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, region: &str) -> BucketSpec {
        BucketSpec::new(name, region, WebsiteConfig::default()).unwrap()
    }

    #[test]
    fn test_bucket_arn_by_partition() {
        assert_eq!(
            spec("my-site", "us-east-1").arn(),
            "arn:aws:s3:::my-site"
        );
        assert_eq!(
            spec("my-site", "cn-north-1").arn(),
            "arn:aws-cn:s3:::my-site"
        );
        assert_eq!(
            spec("my-site", "us-gov-west-1").arn(),
            "arn:aws-us-gov:s3:::my-site"
        );
    }

    #[test]
    fn test_website_endpoint_formats() {
        assert_eq!(
            website_endpoint("my-site", "us-east-1"),
            "my-site.s3-website-us-east-1.amazonaws.com"
        );
        assert_eq!(
            website_endpoint("my-site", "eu-central-1"),
            "my-site.s3-website.eu-central-1.amazonaws.com"
        );
        assert_eq!(
            website_endpoint("my-site", "cn-north-1"),
            "my-site.s3-website.cn-north-1.amazonaws.com.cn"
        );
    }

    #[test]
    fn test_bucket_spec_validation() {
        assert!(BucketSpec::new("Bad_Name", "us-east-1", WebsiteConfig::default()).is_err());
        assert!(BucketSpec::new("good-name", "nowhere", WebsiteConfig::default()).is_err());
        assert!(BucketSpec::new("good-name", "us-east-1", WebsiteConfig::new("")).is_err());
        assert!(
            BucketSpec::new("good-name", "us-east-1", WebsiteConfig::new("docs/index.html"))
                .is_err()
        );
    }

    #[test]
    fn test_policy_tracks_bucket() {
        let bucket = spec("my-terraform-portfolio-site-12345", "us-east-1");
        let desired = DesiredState::new(bucket);
        assert_eq!(desired.policy.bucket(), "my-terraform-portfolio-site-12345");
        assert_eq!(
            desired.policy.resource_pattern(),
            "arn:aws:s3:::my-terraform-portfolio-site-12345/*"
        );
        assert_eq!(desired.public_access_block, PublicAccessBlockSettings::disabled());
        assert!(!desired.force_destroy);
    }

    #[test]
    fn test_access_block_allows_public_policy() {
        assert!(PublicAccessBlockSettings::disabled().allows_public_policy());

        let blocking = PublicAccessBlockSettings {
            block_public_policy: true,
            ..Default::default()
        };
        assert!(!blocking.allows_public_policy());

        // ACL flags don't affect bucket policies
        let acl_only = PublicAccessBlockSettings {
            block_public_acls: true,
            ignore_public_acls: true,
            ..Default::default()
        };
        assert!(acl_only.allows_public_policy());
    }

    #[test]
    fn test_outputs_lookup() {
        let bucket = spec("my-site", "us-east-1");
        let outputs = SiteOutputs::new(&bucket, bucket.website_endpoint());

        assert_eq!(outputs.get("bucket_name"), Some("my-site"));
        assert_eq!(
            outputs.get("website_url"),
            Some("http://my-site.s3-website-us-east-1.amazonaws.com")
        );
        assert_eq!(outputs.get("nope"), None);
        assert_eq!(outputs.iter().count(), SiteOutputs::NAMES.len());
    }
}
