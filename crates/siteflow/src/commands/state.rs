use colored::Colorize;
use siteflow_cloud::{ResourceStatus, StateManager};

/// 状態ファイルの内容を表示する (リモートには問い合わせない)
pub async fn handle(json: bool) -> anyhow::Result<()> {
    let site_file = siteflow_config::find_site_file()?;
    let manager = StateManager::new(site_file.project_root());
    let state = manager.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!(
        "状態ファイル: {}",
        manager.state_path().display().to_string().cyan()
    );

    if state.resources.is_empty() {
        println!("{}", "記録されたリソースはありません".yellow());
        println!("site apply を実行すると記録されます");
        return Ok(());
    }

    println!(
        "最終更新: {}",
        state.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    for (key, resource) in &state.resources {
        let status = match resource.status {
            ResourceStatus::InSync => resource.status.to_string().green(),
            ResourceStatus::Drifted => resource.status.to_string().yellow(),
            ResourceStatus::Unknown => resource.status.to_string().dimmed(),
        };
        println!("  • {} [{}]", key.cyan(), status);
        for (name, value) in &resource.attributes {
            println!("      {}: {}", name, value);
        }
    }
    println!();
    println!(
        "{}",
        "この内容は記録時点のものです。最新の状態は site plan で確認してください".dimmed()
    );

    Ok(())
}
