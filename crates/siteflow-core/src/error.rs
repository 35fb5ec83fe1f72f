use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("'{node}' の値が不正です: {message}")]
    InvalidValue { node: String, message: String },

    #[error("'{0}' ノードが複数定義されています")]
    DuplicateNode(String),

    #[error("未対応のプロバイダーです: {0} (対応: aws)")]
    UnsupportedProvider(String),

    #[error(
        "バケット名が指定されていません\nヒント: site.kdl に bucket \"<name>\" を書くか、--bucket / SITE_BUCKET で指定してください"
    )]
    MissingBucketName,
}

pub type Result<T> = std::result::Result<T, SiteError>;
