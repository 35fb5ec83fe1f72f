use crate::context::{Project, interruptible, was_interrupted};
use crate::utils;
use colored::Colorize;
use siteflow_core::Overrides;

pub async fn handle(overrides: &Overrides, yes: bool) -> anyhow::Result<()> {
    println!("{}", "削除を開始します...".blue().bold());
    let project = Project::load(overrides)?;
    utils::print_loaded_config_file(&project.site_file);
    println!("バケット: {}", project.desired.bucket.name.cyan());

    let reconciler = project.reconciler().await;
    let plan = interruptible(reconciler.refresh_destroy_plan(&project.desired)).await?;

    if !plan.has_changes {
        println!();
        println!("{}", "✓ 削除するリソースはありません".green().bold());
        project.record_state(&reconciler).await;
        return Ok(());
    }

    utils::print_plan(&plan);

    if !yes {
        println!();
        let warning = if project.desired.force_destroy {
            "警告: バケット内のオブジェクトをすべて削除し、バケットを削除します。"
        } else {
            "警告: サイトの設定とバケットを削除します。"
        };
        println!("{}", warning.yellow());
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    println!();
    let result = interruptible(reconciler.apply(&plan)).await;
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
            "✓ 削除が完了しました ({} 件の操作, {}ms)",
            result.operation_count(),
            result.duration_ms
        )
        .green()
        .bold()
    );

    Ok(())
}
