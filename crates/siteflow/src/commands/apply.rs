use crate::context::{Project, interruptible, was_interrupted};
use crate::utils;
use colored::Colorize;
use siteflow_core::Overrides;

pub async fn handle(overrides: &Overrides, yes: bool) -> anyhow::Result<()> {
    println!("{}", "適用を開始します...".blue().bold());
    let project = Project::load(overrides)?;
    utils::print_loaded_config_file(&project.site_file);
    println!("バケット: {}", project.desired.bucket.name.cyan());

    let reconciler = project.reconciler().await;
    let plan = interruptible(reconciler.refresh_plan(&project.desired)).await?;
    utils::print_plan(&plan);

    if plan.has_changes {
        // 確認（--yesが指定されていない場合）
        if !yes {
            println!();
            println!(
                "{}",
                "警告: バケットを作成・変更し、オブジェクトを公開読み取り可能にします。".yellow()
            );
            println!("実行するには --yes オプションを指定してください");
            return Ok(());
        }

        println!();
        let result = interruptible(reconciler.apply(&plan)).await;

        // 途中で失敗しても、反映された分は記録する (中断時は記録しない)
        if !was_interrupted(&result) {
            project.record_state(&reconciler).await;
        }
        let result = result?;

        for applied in &result.applied {
            println!("  {} {}", "✓".green(), applied.message);
        }
        println!();
        println!(
            "{}",
            format!(
                "✓ 適用が完了しました ({} 件の操作, {}ms)",
                result.operation_count(),
                result.duration_ms
            )
            .green()
            .bold()
        );
    } else {
        println!();
        println!("{}", "✓ 変更はありません".green().bold());
    }

    let outputs = interruptible(reconciler.output(&project.desired)).await?;
    println!();
    println!("出力:");
    utils::print_outputs(&outputs);
    println!();
    println!("🌐 {}", outputs.website_url.cyan().bold());

    Ok(())
}
