//! site.kdl の読み込みと上書き適用

use crate::error::{Result, SiteError};
use crate::model::Site;
use crate::parser::parse_site_file;
use std::path::Path;

/// コマンドライン / 環境変数からの上書き
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// --bucket / SITE_BUCKET
    pub bucket: Option<String>,

    /// --region / SITE_REGION
    pub region: Option<String>,
}

/// 上書きを適用する (空文字列は未指定扱い)
pub fn apply_overrides(site: &mut Site, overrides: &Overrides) {
    if let Some(bucket) = overrides.bucket.as_deref().filter(|b| !b.is_empty()) {
        tracing::debug!(bucket, "Bucket name overridden");
        site.bucket.name = Some(bucket.to_string());
    }
    if let Some(region) = overrides.region.as_deref().filter(|r| !r.is_empty()) {
        tracing::debug!(region, "Region overridden");
        site.provider.region = Some(region.to_string());
    }
}

/// ファイルを読み込み、上書きを適用し、バケット名があることを確認する
pub fn load_site<P: AsRef<Path>>(path: P, overrides: &Overrides) -> Result<Site> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Loading site.kdl");

    let mut site = parse_site_file(path)?;
    apply_overrides(&mut site, overrides);

    if site.bucket_name().is_none() {
        return Err(SiteError::MissingBucketName);
    }

    Ok(site)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_site(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("site.kdl");
        fs::write(&path, content).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_load_without_overrides() {
        let (_dir, path) = write_site(
            r#"
            provider "aws" { region "eu-west-1"; }
            bucket "my-site"
            "#,
        );

        let site = load_site(&path, &Overrides::default()).unwrap();
        assert_eq!(site.bucket_name(), Some("my-site"));
        assert_eq!(site.provider.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let (_dir, path) = write_site(
            r#"
            provider "aws" { region "eu-west-1"; }
            bucket "from-file"
            "#,
        );
        let overrides = Overrides {
            bucket: Some("from-flag".to_string()),
            region: Some("ap-northeast-1".to_string()),
        };

        let site = load_site(&path, &overrides).unwrap();
        assert_eq!(site.bucket_name(), Some("from-flag"));
        assert_eq!(site.provider.region.as_deref(), Some("ap-northeast-1"));
    }

    #[test]
    fn test_override_supplies_missing_bucket_name() {
        let (_dir, path) = write_site("bucket { force-destroy; }");

        let overrides = Overrides {
            bucket: Some("my-terraform-portfolio-site-12345".to_string()),
            region: None,
        };
        let site = load_site(&path, &overrides).unwrap();
        assert_eq!(site.bucket_name(), Some("my-terraform-portfolio-site-12345"));
        assert!(site.bucket.force_destroy);
    }

    #[test]
    fn test_missing_bucket_name() {
        let (_dir, path) = write_site("settings { timeout-secs 10; }");

        let result = load_site(&path, &Overrides::default());
        assert!(matches!(result, Err(SiteError::MissingBucketName)));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let mut site = Site::default();
        site.bucket.name = Some("kept".to_string());

        let overrides = Overrides {
            bucket: Some(String::new()),
            region: None,
        };
        apply_overrides(&mut site, &overrides);
        assert_eq!(site.bucket_name(), Some("kept"));
    }
}
