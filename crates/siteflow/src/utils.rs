use colored::Colorize;
use siteflow_cloud::{ActionType, CloudError, Plan, SiteOutputs};
use siteflow_config::SiteFile;

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_config_file(site_file: &SiteFile) {
    println!("📄 読み込んだ設定ファイル:");
    println!(
        "  • {} ({})",
        site_file.path.display().to_string().cyan(),
        site_file.source
    );
}

/// 計画を表示
pub fn print_plan(plan: &Plan) {
    println!();
    println!("{}", "実行計画:".bold());
    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Update => "~".yellow(),
            ActionType::Delete => "-".red(),
            ActionType::NoOp => " ".normal(),
        };
        let line = format!("{} {}", action.resource_kind(), action.description);
        if action.is_change() {
            println!("  {} {}", marker, line);
        } else {
            println!("  {} {}", marker, line.dimmed());
        }
    }
    println!();
    println!("サマリー: {}", plan.summary());
}

/// 出力値を表示
pub fn print_outputs(outputs: &SiteOutputs) {
    for (name, value) in outputs.iter() {
        println!("  {} = {}", name.cyan(), value);
    }
}

/// エラーに応じた対処方法
pub fn hints(error: &anyhow::Error) -> Vec<String> {
    error
        .downcast_ref::<CloudError>()
        .map(cloud_hints)
        .unwrap_or_default()
}

fn cloud_hints(error: &CloudError) -> Vec<String> {
    match error {
        CloudError::PartialApply { source, .. } => {
            let mut hints = vec![
                "同じコマンドを --yes 付きで再実行すると、残りの操作だけを実行します".to_string(),
            ];
            hints.extend(cloud_hints(source));
            hints
        }
        CloudError::BucketNameConflict(_) => vec![
            "ヒント: バケット名は全アカウントで一意です。--bucket または SITE_BUCKET で別の名前を指定してください"
                .to_string(),
        ],
        CloudError::NotReady(_) => vec!["ヒント: 先に site apply --yes を実行してください".to_string()],
        CloudError::AuthenticationFailed(_) => vec![
            "ヒント: AWS の認証情報 (AWS_PROFILE, AWS_ACCESS_KEY_ID など) を確認してください".to_string(),
        ],
        CloudError::BucketNotEmpty(_) => vec![
            "ヒント: site.kdl の bucket に force-destroy を指定するとオブジェクトごと削除します"
                .to_string(),
        ],
        CloudError::RetryExhausted { .. } | CloudError::Timeout(_) => vec![
            "ヒント: settings の timeout-secs / retry を調整できます".to_string(),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteflow_cloud::OperationKind;

    #[test]
    fn test_partial_apply_hints_include_cause() {
        let error = anyhow::Error::new(CloudError::PartialApply {
            completed: vec![OperationKind::DeleteBucketPolicy],
            failed: OperationKind::DeleteBucket,
            source: Box::new(CloudError::BucketNotEmpty("my-site".into())),
        });

        let hints = hints(&error);
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("--yes"));
        assert!(hints[1].contains("force-destroy"));
    }

    #[test]
    fn test_non_cloud_errors_have_no_hints() {
        let error = anyhow::anyhow!("something else");
        assert!(hints(&error).is_empty());
    }

    #[test]
    fn test_conflict_hint_mentions_override() {
        let error = anyhow::Error::new(CloudError::BucketNameConflict("taken".into()));
        assert!(hints(&error)[0].contains("SITE_BUCKET"));
    }
}
