pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "SITE_CONFIG_PATH";

/// プロジェクト内の作業ディレクトリ名 (状態ファイルもここに置く)
pub const PROJECT_DIR: &str = ".siteflow";

/// 検索するファイル名 (優先順)
pub const CANDIDATES: [&str; 4] = ["site.local.kdl", ".site.local.kdl", "site.kdl", ".site.kdl"];

const GLOBAL_FILE: &str = "site.kdl";

/// 設定ファイルがどこで見つかったか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// SITE_CONFIG_PATH
    EnvVar,
    /// カレントディレクトリ
    Project,
    /// ./.siteflow/
    ProjectDir,
    /// ~/.config/siteflow/
    Global,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::EnvVar => write!(f, "{}", CONFIG_PATH_ENV),
            ConfigSource::Project => write!(f, "project"),
            ConfigSource::ProjectDir => write!(f, "{}/", PROJECT_DIR),
            ConfigSource::Global => write!(f, "global"),
        }
    }
}

/// 見つかった設定ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    pub path: PathBuf,
    pub source: ConfigSource,
}

impl SiteFile {
    /// 状態ファイルの基準となるディレクトリ
    ///
    /// `.siteflow/` 内のファイルはその親、グローバル設定はカレントディレクトリ
    pub fn project_root(&self) -> PathBuf {
        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        match self.source {
            ConfigSource::ProjectDir => parent.parent().map(Path::to_path_buf).unwrap_or(parent),
            ConfigSource::Global => std::env::current_dir().unwrap_or(parent),
            ConfigSource::EnvVar | ConfigSource::Project => parent,
        }
    }
}

/// プロジェクトのsite.kdlファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 SITE_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: site.local.kdl, .site.local.kdl, site.kdl, .site.kdl
/// 3. ./.siteflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/siteflow/site.kdl (グローバル設定)
pub fn find_site_file() -> Result<SiteFile> {
    if let Some(config_path) = std::env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        // 明示的に指定されたファイルが無い場合は他を探さない
        if !path.is_file() {
            return Err(ConfigError::ConfigPathNotFound(path));
        }
        return Ok(SiteFile {
            path,
            source: ConfigSource::EnvVar,
        });
    }

    let current_dir = std::env::current_dir()?;
    if let Some(found) = find_site_file_in(&current_dir) {
        return Ok(found);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("siteflow").join(GLOBAL_FILE);
        if global.is_file() {
            return Ok(SiteFile {
                path: global,
                source: ConfigSource::Global,
            });
        }
    }

    Err(ConfigError::SiteFileNotFound)
}

/// `dir` とその `.siteflow/` だけを検索する
pub fn find_site_file_in(dir: &Path) -> Option<SiteFile> {
    let in_dir = |base: &Path| {
        CANDIDATES
            .iter()
            .map(|name| base.join(name))
            .find(|path| path.is_file())
    };

    if let Some(path) = in_dir(dir) {
        return Some(SiteFile {
            path,
            source: ConfigSource::Project,
        });
    }

    let project_dir = dir.join(PROJECT_DIR);
    if project_dir.is_dir() {
        if let Some(path) = in_dir(&project_dir) {
            return Some(SiteFile {
                path,
                source: ConfigSource::ProjectDir,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    /// カレントディレクトリを一時的に移動して `f` を実行
    fn in_dir<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, f);
        std::env::set_current_dir(original_dir).unwrap();
        result
    }

    #[test]
    #[serial]
    fn test_find_site_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("site.kdl"), "// test").unwrap();

        let found = in_dir(temp_dir.path(), find_site_file).unwrap();
        assert!(found.path.ends_with("site.kdl"));
        assert_eq!(found.source, ConfigSource::Project);
    }

    #[test]
    #[serial]
    fn test_local_file_has_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("site.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("site.local.kdl"), "// local").unwrap();

        let found = in_dir(temp_dir.path(), find_site_file).unwrap();

        // site.local.kdl が優先される
        assert!(found.path.ends_with("site.local.kdl"));
    }

    #[test]
    fn test_hidden_local_beats_visible_shared() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(".site.local.kdl"), "// hidden local").unwrap();
        fs::write(temp_dir.path().join("site.kdl"), "// visible").unwrap();

        let found = find_site_file_in(temp_dir.path()).unwrap();
        assert!(found.path.ends_with(".site.local.kdl"));
    }

    #[test]
    fn test_find_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(PROJECT_DIR);
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("site.kdl"), "// in project dir").unwrap();

        let found = find_site_file_in(temp_dir.path()).unwrap();
        assert!(found.path.ends_with(".siteflow/site.kdl"));
        assert_eq!(found.source, ConfigSource::ProjectDir);

        // 状態ファイルは .siteflow/ の親を基準にする
        assert_eq!(found.project_root(), temp_dir.path());
    }

    #[test]
    fn test_current_dir_beats_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(PROJECT_DIR);
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("site.local.kdl"), "// nested").unwrap();
        fs::write(temp_dir.path().join(".site.kdl"), "// top").unwrap();

        let found = find_site_file_in(temp_dir.path()).unwrap();
        assert_eq!(found.source, ConfigSource::Project);
        assert_eq!(found.project_root(), temp_dir.path());
    }

    #[test]
    #[serial]
    fn test_env_var_takes_precedence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        let found = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), find_site_file).unwrap();
        assert_eq!(found.path, config_path);
        assert_eq!(found.source, ConfigSource::EnvVar);
    }

    #[test]
    #[serial]
    fn test_env_var_pointing_nowhere_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.kdl");

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(&missing), find_site_file);
        match result {
            Err(ConfigError::ConfigPathNotFound(path)) => assert_eq!(path, missing),
            other => panic!("Expected ConfigPathNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_dir_has_no_site_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(find_site_file_in(temp_dir.path()).is_none());
    }

    #[test]
    fn test_not_found_message_lists_locations() {
        let message = ConfigError::SiteFileNotFound.to_string();
        assert!(message.contains("site.kdl"));
        assert!(message.contains(".siteflow"));
        assert!(message.contains(CONFIG_PATH_ENV));
    }
}
