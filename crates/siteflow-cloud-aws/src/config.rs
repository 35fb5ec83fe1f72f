//! AWS connection settings

use serde::{Deserialize, Serialize};
use siteflow_cloud::DEFAULT_REGION;
use tracing::debug;

/// Connection settings for the S3 provider.
///
/// Credentials always come from the standard AWS chain (environment, shared
/// config files, instance metadata); only the profile name can be chosen here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region new buckets are created in and requests are signed for
    pub region: String,

    /// Named profile from `~/.aws/config`
    #[serde(default)]
    pub profile: Option<String>,

    /// Endpoint override for S3-compatible services (e.g. LocalStack, MinIO)
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    #[serde(default)]
    pub force_path_style: bool,
}

impl AwsConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    #[must_use]
    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Whether requests go somewhere other than AWS itself
    pub fn is_custom_endpoint(&self) -> bool {
        self.endpoint_url.is_some()
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

/// Load the shared SDK configuration for `config`
///
/// The SDK's own retries are off: each reconciler attempt is exactly one
/// HTTP request, so `max-attempts` and `timeout-secs` mean what they say.
pub async fn build_sdk_config(config: &AwsConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::from_env()
        .region(aws_config::Region::new(config.region.clone()))
        .retry_config(aws_config::retry::RetryConfig::disabled());

    if let Some(profile) = &config.profile {
        debug!(profile = %profile, "using AWS profile");
        loader = loader.profile_name(profile);
    }

    if let Some(endpoint) = &config.endpoint_url {
        debug!(endpoint = %endpoint, "using custom S3 endpoint");
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}

/// Build an S3 client honouring the path-style setting
pub async fn build_s3_client(config: &AwsConfig) -> aws_sdk_s3::Client {
    let sdk_config = build_sdk_config(config).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.force_path_style)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_region() {
        let config = AwsConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.profile.is_none());
        assert!(!config.is_custom_endpoint());
        assert!(!config.force_path_style);
    }

    #[test]
    fn test_builder_methods() {
        let config = AwsConfig::new("eu-west-1")
            .with_profile("portfolio")
            .with_endpoint_url("http://localhost:4566")
            .with_force_path_style(true);

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.profile.as_deref(), Some("portfolio"));
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(config.is_custom_endpoint());
        assert!(config.force_path_style);
    }

    #[tokio::test]
    async fn test_sdk_makes_a_single_attempt() {
        let config = AwsConfig::new("us-east-1").with_endpoint_url("http://localhost:4566");

        let sdk_config = build_sdk_config(&config).await;
        let retry = sdk_config.retry_config().unwrap();
        assert_eq!(retry.max_attempts(), 1);

        let client = build_s3_client(&config).await;
        assert_eq!(client.config().retry_config().unwrap().max_attempts(), 1);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AwsConfig = serde_json::from_str(r#"{"region": "ap-northeast-1"}"#).unwrap();
        assert_eq!(config, AwsConfig::new("ap-northeast-1"));
    }
}
