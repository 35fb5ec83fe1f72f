//! bucket ノードのパース

use super::{children, first_string, flag, required_string};
use crate::error::{Result, SiteError};
use crate::model::{BucketConfig, PublicAccessBlockConfig, WebsiteBlock};
use kdl::KdlNode;

/// bucket ノードをパース
///
/// 名前は省略可能 (--bucket / SITE_BUCKET で後から与える)
pub fn parse_bucket(node: &KdlNode) -> Result<BucketConfig> {
    let mut bucket = BucketConfig {
        name: first_string(node).map(|s| s.to_string()),
        ..Default::default()
    };

    for child in children(node) {
        match child.name().value() {
            "website" => bucket.website = parse_website(child)?,
            "public_access_block" | "public-access-block" => {
                bucket.public_access_block = parse_public_access_block(child)?
            }
            "force_destroy" | "force-destroy" => bucket.force_destroy = flag(child)?,
            other => tracing::warn!(node = other, "Unknown bucket setting, ignoring"),
        }
    }

    Ok(bucket)
}

fn parse_website(node: &KdlNode) -> Result<WebsiteBlock> {
    let mut website = WebsiteBlock::default();

    for child in children(node) {
        match child.name().value() {
            "index_document" | "index-document" | "index" => {
                website.index_document = Some(required_string(child)?)
            }
            "error_document" | "error-document" | "error" => {
                website.error_document = Some(required_string(child)?)
            }
            other => {
                return Err(SiteError::InvalidConfig(format!(
                    "website ブロックに不明な設定があります: {}",
                    other
                )));
            }
        }
    }

    Ok(website)
}

fn parse_public_access_block(node: &KdlNode) -> Result<PublicAccessBlockConfig> {
    let mut config = PublicAccessBlockConfig::default();

    for child in children(node) {
        let value = Some(flag(child)?);
        match child.name().value() {
            "block_public_acls" | "block-public-acls" => config.block_public_acls = value,
            "ignore_public_acls" | "ignore-public-acls" => config.ignore_public_acls = value,
            "block_public_policy" | "block-public-policy" => config.block_public_policy = value,
            "restrict_public_buckets" | "restrict-public-buckets" => {
                config.restrict_public_buckets = value
            }
            other => {
                return Err(SiteError::InvalidConfig(format!(
                    "public-access-block ブロックに不明な設定があります: {}",
                    other
                )));
            }
        }
    }

    Ok(config)
}
