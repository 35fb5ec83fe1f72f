use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: site.local.kdl, .site.local.kdl, site.kdl, .site.kdl\n\
        - ./.siteflow/ ディレクトリ\n\
        - ~/.config/siteflow/site.kdl\n\
        または SITE_CONFIG_PATH 環境変数で直接指定できます"
    )]
    SiteFileNotFound,

    #[error("SITE_CONFIG_PATH で指定されたファイルが存在しません: {0}")]
    ConfigPathNotFound(PathBuf),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
