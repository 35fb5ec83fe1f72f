//! AWS S3 provider for SiteFlow
//!
//! This crate implements the CloudProvider trait for Amazon S3,
//! enabling SiteFlow to host a static website from a single bucket.
//!
//! # Features
//!
//! - Bucket creation with region-specific location constraints
//! - Website hosting configuration (index/error documents)
//! - Public access block settings and public-read bucket policy
//! - Teardown, optionally emptying the bucket first
//!
//! # Requirements
//!
//! - Credentials from the standard AWS chain (environment variables,
//!   `~/.aws/credentials`, SSO, instance metadata)
//! - An endpoint override works for S3-compatible services such as LocalStack
//!
//! # Example
//!
//! ```ignore
//! use siteflow_cloud::CloudProvider;
//! use siteflow_cloud_aws::{AwsConfig, AwsS3Provider};
//!
//! let provider = AwsS3Provider::new(AwsConfig::new("us-east-1")).await;
//!
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//!
//! let state = provider.observe("my-terraform-portfolio-site-12345").await?;
//! ```

pub mod config;
pub mod error;
pub mod provider;

pub use config::{AwsConfig, build_s3_client, build_sdk_config};
pub use error::{classify, from_sdk_error};
pub use provider::AwsS3Provider;
