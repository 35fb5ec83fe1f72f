//! Bucket name and region validation
//!
//! Rules follow the general-purpose bucket naming rules of the S3 API, so a
//! name that passes here is rejected remotely only when it is already taken.

use crate::error::{CloudError, Result};
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 63;

const RESERVED_PREFIXES: &[&str] = &["xn--", "sthree-", "amzn-s3-demo-"];
const RESERVED_SUFFIXES: &[&str] = &["-s3alias", "--ol-s3", ".mrap", "--x-s3"];

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]*[a-z0-9]$").expect("valid regex"));

static REGION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]*)?-[a-z]+-[0-9]{1,2}$").expect("valid regex")
});

/// Validate a bucket name.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(CloudError::InvalidConfig(format!(
            "invalid bucket name '{}': {}",
            name, reason
        )))
    };

    if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN {
        return invalid("must be between 3 and 63 characters long");
    }
    if !NAME_PATTERN.is_match(name) {
        return invalid(
            "only lowercase letters, digits, '.' and '-' are allowed, \
             and it must begin and end with a letter or digit",
        );
    }
    if name.contains("..") {
        return invalid("must not contain two adjacent periods");
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return invalid("must not be formatted as an IP address");
    }
    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| name.starts_with(*p)) {
        return invalid(&format!("prefix '{}' is reserved", prefix));
    }
    if let Some(suffix) = RESERVED_SUFFIXES.iter().find(|s| name.ends_with(*s)) {
        return invalid(&format!("suffix '{}' is reserved", suffix));
    }

    Ok(())
}

/// Validate a region identifier such as `us-east-1` or `us-gov-west-1`.
pub fn validate_region(region: &str) -> Result<()> {
    if REGION_PATTERN.is_match(region) {
        Ok(())
    } else {
        Err(CloudError::InvalidConfig(format!(
            "invalid region '{}': expected something like 'us-east-1'",
            region
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bucket_names() {
        for name in [
            "my-terraform-portfolio-site-12345",
            "abc",
            "site.example.com",
            "a1-b2-c3",
        ] {
            assert!(validate_bucket_name(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_bucket_names() {
        for name in [
            "ab",
            &"a".repeat(64),
            "My-Site",
            "site_name",
            "-leading",
            "trailing-",
            "double..dot",
            "192.168.1.1",
            "xn--punycode",
            "sthree-bucket",
            "access-point-s3alias",
            "bucket--ol-s3",
        ] {
            let err = validate_bucket_name(name).unwrap_err();
            assert!(
                matches!(err, CloudError::InvalidConfig(_)),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_regions() {
        assert!(validate_region("us-east-1").is_ok());
        assert!(validate_region("ap-northeast-1").is_ok());
        assert!(validate_region("us-gov-west-1").is_ok());
        assert!(validate_region("cn-north-1").is_ok());

        assert!(validate_region("").is_err());
        assert!(validate_region("useast1").is_err());
        assert!(validate_region("US-EAST-1").is_err());
        assert!(validate_region("tk1a").is_err());
    }
}
