//! site.kdl のモデル
//!
//! パース直後の値をそのまま保持する。未指定の項目は `None` のままで、
//! デフォルト値の解決は利用側 (CLI) で行う。

use serde::{Deserialize, Serialize};

/// プロバイダーのデフォルト
pub const DEFAULT_PROVIDER: &str = "aws";

/// 対応しているプロバイダー
pub const SUPPORTED_PROVIDERS: &[&str] = &["aws"];

/// site.kdl 全体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub provider: ProviderConfig,
    pub bucket: BucketConfig,
    pub settings: Settings,
}

impl Site {
    /// バケット名 (上書き適用後)
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket.name.as_deref()
    }
}

/// provider ノード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// プロバイダー名 (aws)
    pub name: String,

    /// リージョン (us-east-1, ap-northeast-1 など)
    pub region: Option<String>,

    /// AWS の名前付きプロファイル
    pub profile: Option<String>,

    /// エンドポイントの上書き (LocalStack など)
    pub endpoint: Option<String>,

    /// パススタイルでバケットを指定する
    pub force_path_style: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER.to_string(),
            region: None,
            profile: None,
            endpoint: None,
            force_path_style: false,
        }
    }
}

/// bucket ノード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// バケット名 (--bucket / SITE_BUCKET で上書き可能)
    pub name: Option<String>,

    pub website: WebsiteBlock,

    pub public_access_block: PublicAccessBlockConfig,

    /// destroy 時にオブジェクトごと削除する
    pub force_destroy: bool,
}

/// website ブロック
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteBlock {
    pub index_document: Option<String>,
    pub error_document: Option<String>,
}

/// public-access-block ブロック (未指定はすべて false)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessBlockConfig {
    pub block_public_acls: Option<bool>,
    pub ignore_public_acls: Option<bool>,
    pub block_public_policy: Option<bool>,
    pub restrict_public_buckets: Option<bool>,
}

/// settings ノード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// 1回のリモート呼び出しのタイムアウト (秒)
    pub timeout_secs: Option<u64>,

    pub retry: RetrySettings,
}

/// settings.retry ブロック
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}
