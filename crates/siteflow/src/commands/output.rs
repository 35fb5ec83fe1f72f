use crate::context::{Project, interruptible};
use crate::utils;
use siteflow_cloud::SiteOutputs;
use siteflow_core::Overrides;

pub async fn handle(overrides: &Overrides, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    // 名前の誤りはリモートに問い合わせる前に検出する
    if let Some(name) = name {
        if !SiteOutputs::NAMES.contains(&name) {
            anyhow::bail!(
                "出力 '{}' は存在しません\n利用可能な出力: {}",
                name,
                SiteOutputs::NAMES.join(", ")
            );
        }
    }

    let project = Project::load(overrides)?;
    let reconciler = project.reconciler().await;
    let outputs = interruptible(reconciler.output(&project.desired)).await?;

    match (name, json) {
        (Some(name), json) => {
            let value = outputs.get(name).unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string(value)?);
            } else {
                println!("{}", value);
            }
        }
        (None, true) => println!("{}", serde_json::to_string_pretty(&outputs)?),
        (None, false) => utils::print_outputs(&outputs),
    }

    Ok(())
}
