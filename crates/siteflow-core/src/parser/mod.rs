//! KDLパーサー
//!
//! site.kdl をパースして [`Site`] を生成します。
//! ノードごとのパース処理はモジュールに分離されています。

mod bucket;
mod settings;

use bucket::parse_bucket;
use settings::parse_settings;

use crate::error::{Result, SiteError};
use crate::model::{ProviderConfig, SUPPORTED_PROVIDERS, Site};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてSiteを生成
pub fn parse_site_file<P: AsRef<Path>>(path: P) -> Result<Site> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| SiteError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_site_string(&content)
}

/// KDL文字列をパース
pub fn parse_site_string(content: &str) -> Result<Site> {
    let doc: KdlDocument = content.parse()?;

    let mut site = Site::default();
    let mut seen_provider = false;
    let mut seen_bucket = false;
    let mut seen_settings = false;

    for node in doc.nodes() {
        let name = node.name().value();
        match name {
            "provider" => {
                once(&mut seen_provider, name)?;
                site.provider = parse_provider(node)?;
            }
            "bucket" => {
                once(&mut seen_bucket, name)?;
                site.bucket = parse_bucket(node)?;
            }
            "settings" => {
                once(&mut seen_settings, name)?;
                site.settings = parse_settings(node)?;
            }
            other => {
                // 不明なノードはスキップ
                tracing::warn!(node = other, "Unknown node in site.kdl, ignoring");
            }
        }
    }

    Ok(site)
}

fn once(seen: &mut bool, node: &str) -> Result<()> {
    if std::mem::replace(seen, true) {
        return Err(SiteError::DuplicateNode(node.to_string()));
    }
    Ok(())
}

/// provider ノードをパース
///
/// 名前を省略した場合は aws
pub fn parse_provider(node: &KdlNode) -> Result<ProviderConfig> {
    let mut provider = ProviderConfig::default();

    if let Some(name) = first_string(node) {
        if !SUPPORTED_PROVIDERS.contains(&name) {
            return Err(SiteError::UnsupportedProvider(name.to_string()));
        }
        provider.name = name.to_string();
    }

    for child in children(node) {
        match child.name().value() {
            "region" => provider.region = Some(required_string(child)?),
            "profile" => provider.profile = Some(required_string(child)?),
            "endpoint" | "endpoint_url" | "endpoint-url" => {
                provider.endpoint = Some(required_string(child)?)
            }
            "force_path_style" | "force-path-style" => provider.force_path_style = flag(child)?,
            other => tracing::warn!(node = other, "Unknown provider setting, ignoring"),
        }
    }

    Ok(provider)
}

/// 子ノードのイテレータ (子が無ければ空)
pub(crate) fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
    node.children().into_iter().flat_map(|c| c.nodes())
}

/// 最初の引数を文字列として取得
pub(crate) fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

/// 文字列引数が必須のノード
pub(crate) fn required_string(node: &KdlNode) -> Result<String> {
    first_string(node)
        .map(|s| s.to_string())
        .ok_or_else(|| invalid(node, "文字列の値が必要です"))
}

/// 真偽値ノード: 引数なしは true、`#true` / `#false` はその値
pub(crate) fn flag(node: &KdlNode) -> Result<bool> {
    match node.entries().iter().find(|e| e.name().is_none()) {
        None => Ok(true),
        Some(entry) => entry
            .value()
            .as_bool()
            .ok_or_else(|| invalid(node, "#true または #false を指定してください")),
    }
}

/// 正の整数ノード
pub(crate) fn positive_integer<T: TryFrom<i128>>(node: &KdlNode) -> Result<T> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
        .filter(|v| *v > 0)
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| invalid(node, "正の整数を指定してください"))
}

/// 数値ノード (整数も可)
pub(crate) fn number(node: &KdlNode) -> Result<f64> {
    let value = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value());

    value
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .ok_or_else(|| invalid(node, "数値を指定してください"))
}

pub(crate) fn invalid(node: &KdlNode, message: &str) -> SiteError {
    SiteError::InvalidValue {
        node: node.name().value().to_string(),
        message: message.to_string(),
    }
}
