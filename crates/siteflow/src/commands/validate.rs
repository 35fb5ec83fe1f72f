use crate::desired;
use colored::Colorize;
use siteflow_core::Overrides;

pub fn handle(overrides: &Overrides) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let site_file = match siteflow_config::find_site_file() {
        Ok(found) => found,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定ファイルが見つかりません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    println!(
        "設定ファイル: {} ({})",
        site_file.path.display().to_string().cyan(),
        site_file.source
    );

    let checked = siteflow_core::load_site(&site_file.path, overrides)
        .map_err(anyhow::Error::from)
        .and_then(|site| {
            let desired = desired::desired_state(&site)?;
            Ok((site, desired))
        });

    match checked {
        Ok((site, desired)) => {
            println!("{}", "✓ 設定ファイルは正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  プロバイダー: {}", site.provider.name.cyan());
            println!("  リージョン: {}", desired.bucket.region);
            if let Some(profile) = &site.provider.profile {
                println!("  プロファイル: {}", profile);
            }
            if let Some(endpoint) = &site.provider.endpoint {
                println!("  エンドポイント: {}", endpoint);
            }
            println!("  バケット: {}", desired.bucket.name.cyan());
            println!("    - ARN: {}", desired.bucket.arn());
            println!(
                "    - インデックス: {}",
                desired.bucket.website.index_document
            );
            println!(
                "    - エラーページ: {}",
                desired
                    .bucket
                    .website
                    .error_document
                    .as_deref()
                    .unwrap_or("(未設定)")
            );
            println!("    - 公開エンドポイント: {}", desired.bucket.website_endpoint());
            if desired.force_destroy {
                println!("    - force-destroy: {}", "有効".yellow());
            }
            if !desired.public_access_block.allows_public_policy() {
                println!();
                println!(
                    "{}",
                    "⚠ block-public-policy / restrict-public-buckets が有効なため、サイトは公開されません"
                        .yellow()
                );
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
