use crate::context::{Project, interruptible};
use crate::utils;
use colored::Colorize;
use siteflow_core::Overrides;

pub async fn handle(overrides: &Overrides) -> anyhow::Result<()> {
    let project = Project::load(overrides)?;
    utils::print_loaded_config_file(&project.site_file);
    println!("バケット: {}", project.desired.bucket.name.cyan());
    println!("リージョン: {}", project.desired.bucket.region.cyan());

    println!();
    println!("{}", "リモートの状態を取得中...".blue());
    let reconciler = project.reconciler().await;
    let plan = interruptible(reconciler.refresh_plan(&project.desired)).await?;

    utils::print_plan(&plan);

    println!();
    if plan.has_changes {
        println!("適用するには site apply --yes を実行してください");
    } else {
        println!("{}", "✓ 変更はありません".green().bold());
    }

    Ok(())
}
