//! site.kdl のモデルから reconciler の入力を組み立てる

use siteflow_cloud::{
    BucketSpec, CloudError, DEFAULT_REGION, DesiredState, PublicAccessBlockSettings, RetryConfig,
    WebsiteConfig,
};
use siteflow_cloud_aws::AwsConfig;
use siteflow_core::{PublicAccessBlockConfig, Settings, Site};
use std::time::Duration;

/// 1回のリモート呼び出しのデフォルトタイムアウト
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// リージョン (未指定なら us-east-1)
pub fn region(site: &Site) -> &str {
    site.provider.region.as_deref().unwrap_or(DEFAULT_REGION)
}

/// 望ましい状態を組み立てる (バケット名・リージョンの検証を含む)
pub fn desired_state(site: &Site) -> Result<DesiredState, CloudError> {
    let name = site
        .bucket_name()
        .ok_or_else(|| CloudError::InvalidConfig("bucket name is not set".to_string()))?;

    let block = &site.bucket.website;
    let mut website = WebsiteConfig::default();
    if let Some(index) = &block.index_document {
        website.index_document = index.clone();
    }
    website.error_document = block.error_document.clone();

    let bucket = BucketSpec::new(name, region(site), website)?;

    Ok(DesiredState::new(bucket)
        .with_public_access_block(public_access_block(&site.bucket.public_access_block))
        .with_force_destroy(site.bucket.force_destroy))
}

fn public_access_block(config: &PublicAccessBlockConfig) -> PublicAccessBlockSettings {
    PublicAccessBlockSettings {
        block_public_acls: config.block_public_acls.unwrap_or(false),
        ignore_public_acls: config.ignore_public_acls.unwrap_or(false),
        block_public_policy: config.block_public_policy.unwrap_or(false),
        restrict_public_buckets: config.restrict_public_buckets.unwrap_or(false),
    }
}

/// リトライ設定 (未指定の項目はデフォルト)
pub fn retry_config(settings: &Settings) -> RetryConfig {
    let defaults = RetryConfig::default();
    let retry = &settings.retry;
    RetryConfig {
        max_attempts: retry.max_attempts.unwrap_or(defaults.max_attempts),
        initial_delay: retry
            .initial_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_delay),
        max_delay: retry
            .max_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay),
        backoff_multiplier: retry
            .backoff_multiplier
            .unwrap_or(defaults.backoff_multiplier),
    }
}

pub fn operation_timeout(settings: &Settings) -> Duration {
    Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
}

/// AWS 接続設定
pub fn aws_config(site: &Site) -> AwsConfig {
    let provider = &site.provider;
    let mut config = AwsConfig::new(region(site)).with_force_path_style(provider.force_path_style);
    if let Some(profile) = &provider.profile {
        config = config.with_profile(profile);
    }
    if let Some(endpoint) = &provider.endpoint {
        config = config.with_endpoint_url(endpoint);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteflow_core::parse_site_string;

    #[test]
    fn test_defaults() {
        let site = parse_site_string(r#"bucket "my-terraform-portfolio-site-12345""#).unwrap();
        let desired = desired_state(&site).unwrap();

        assert_eq!(desired.bucket.region, "us-east-1");
        assert_eq!(desired.bucket.website.index_document, "index.html");
        assert!(desired.bucket.website.error_document.is_none());
        assert_eq!(desired.public_access_block, PublicAccessBlockSettings::disabled());
        assert!(!desired.force_destroy);
        assert_eq!(
            desired.policy.resource_pattern(),
            "arn:aws:s3:::my-terraform-portfolio-site-12345/*"
        );

        assert_eq!(operation_timeout(&site.settings), Duration::from_secs(60));
        assert_eq!(retry_config(&site.settings).max_attempts, 3);
    }

    #[test]
    fn test_values_from_file() {
        let site = parse_site_string(
            r#"
            provider "aws" {
                region "eu-central-1"
                profile "portfolio"
                endpoint "http://localhost:4566"
                force-path-style
            }
            bucket "my-site" {
                website {
                    index-document "home.html"
                    error-document "404.html"
                }
                public-access-block {
                    block-public-acls #true
                }
                force-destroy
            }
            settings {
                timeout-secs 15
                retry {
                    max-attempts 5
                    initial-delay-ms 100
                }
            }
            "#,
        )
        .unwrap();

        let desired = desired_state(&site).unwrap();
        assert_eq!(desired.bucket.region, "eu-central-1");
        assert_eq!(desired.bucket.website.index_document, "home.html");
        assert_eq!(desired.bucket.website.error_document.as_deref(), Some("404.html"));
        assert!(desired.public_access_block.block_public_acls);
        assert!(!desired.public_access_block.block_public_policy);
        assert!(desired.force_destroy);

        let retry = retry_config(&site.settings);
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(100));
        assert_eq!(retry.max_delay, Duration::from_secs(30));
        assert_eq!(operation_timeout(&site.settings), Duration::from_secs(15));

        let aws = aws_config(&site);
        assert_eq!(aws.region, "eu-central-1");
        assert_eq!(aws.profile.as_deref(), Some("portfolio"));
        assert_eq!(aws.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(aws.force_path_style);
    }

    #[test]
    fn test_invalid_bucket_name() {
        let site = parse_site_string(r#"bucket "Not_A_Valid_Bucket""#).unwrap();
        assert!(matches!(
            desired_state(&site),
            Err(CloudError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_region() {
        let site = parse_site_string(
            r#"
            provider "aws" { region "moon-base"; }
            bucket "my-site"
            "#,
        )
        .unwrap();
        assert!(matches!(
            desired_state(&site),
            Err(CloudError::InvalidConfig(_))
        ));
    }
}
