//! コマンド共通の読み込み処理

use crate::desired;
use colored::Colorize;
use siteflow_cloud::{DesiredState, Reconciler, StateManager};
use siteflow_cloud_aws::AwsS3Provider;
use siteflow_config::SiteFile;
use siteflow_core::{Overrides, Site};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// 読み込んだ site.kdl と、そこから組み立てた望ましい状態
pub struct Project {
    pub site_file: SiteFile,
    pub site: Site,
    pub desired: DesiredState,
}

impl Project {
    /// 設定ファイルを探して読み込む
    pub fn load(overrides: &Overrides) -> anyhow::Result<Self> {
        let site_file = siteflow_config::find_site_file()?;
        let site = siteflow_core::load_site(&site_file.path, overrides)?;
        let desired = desired::desired_state(&site)?;

        Ok(Self {
            site_file,
            site,
            desired,
        })
    }

    /// AWS プロバイダーに接続した Reconciler を作る
    pub async fn reconciler(&self) -> Reconciler {
        let config = desired::aws_config(&self.site);
        tracing::debug!(
            region = %config.region,
            profile = ?config.profile,
            endpoint = ?config.endpoint_url,
            "Connecting to AWS"
        );
        let provider = AwsS3Provider::new(config).await;

        Reconciler::new(Arc::new(provider))
            .with_retry(desired::retry_config(&self.site.settings))
            .with_operation_timeout(desired::operation_timeout(&self.site.settings))
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(self.site_file.project_root())
    }

    /// 最新のリモート状態を状態ファイルに記録する
    ///
    /// 記録に失敗してもコマンド自体は失敗させない。Ctrl-C で中断できる
    pub async fn record_state(&self, reconciler: &Reconciler) {
        let observed = match interruptible(reconciler.observe(&self.desired)).await {
            Ok(observed) => observed,
            Err(e) => {
                tracing::warn!(error = %e, "Could not refresh remote state for the journal");
                return;
            }
        };

        let manager = self.state_manager();
        match manager.record(&self.desired, &observed).await {
            Ok(_) => tracing::debug!(path = %manager.state_path().display(), "State recorded"),
            Err(e) => eprintln!("  {} 状態ファイルを更新できませんでした: {}", "⚠".yellow(), e),
        }
    }
}

/// Ctrl-C による中断
#[derive(Debug, Error)]
#[error("操作は中断されました。site plan でリモートの状態を確認してください")]
pub struct Interrupted;

/// 中断されたかどうか (中断後は状態ファイルを更新しない)
pub fn was_interrupted<T>(result: &anyhow::Result<T>) -> bool {
    matches!(result, Err(e) if e.is::<Interrupted>())
}

/// Ctrl-C で中断できるようにリモート操作を実行する
///
/// 中断時は実行中の呼び出しを破棄する。結果は次回の plan で再取得する
pub async fn interruptible<T, F>(operation: F) -> anyhow::Result<T>
where
    F: Future<Output = siteflow_cloud::Result<T>>,
{
    tokio::select! {
        result = operation => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            eprintln!("{}", "中断しました".yellow().bold());
            Err(Interrupted.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteflow_cloud::CloudError;

    #[test]
    fn test_only_interrupts_skip_recording() {
        let interrupted: anyhow::Result<()> = Err(Interrupted.into());
        assert!(was_interrupted(&interrupted));

        let failed: anyhow::Result<()> =
            Err(CloudError::Transient("SlowDown".to_string()).into());
        assert!(!was_interrupted(&failed));

        assert!(!was_interrupted(&Ok(())));
    }

    #[tokio::test]
    async fn test_completed_operation_is_returned() {
        let value = interruptible(async { Ok::<_, CloudError>(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = interruptible(async {
            Err::<(), _>(CloudError::NotReady("no bucket".to_string()))
        })
        .await
        .unwrap_err();
        assert!(!err.is::<Interrupted>());
        assert!(matches!(
            err.downcast_ref::<CloudError>(),
            Some(CloudError::NotReady(_))
        ));
    }
}
