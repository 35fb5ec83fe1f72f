mod commands;
mod context;
mod desired;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use siteflow_core::Overrides;

#[derive(Parser)]
#[command(name = "site")]
#[command(about = "静的サイト用 S3 バケットを宣言的に管理する", long_about = None)]
struct Cli {
    /// デバッグログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    /// バケット名 (site.kdl の bucket を上書き)
    #[arg(long, env = "SITE_BUCKET", global = true)]
    bucket: Option<String>,

    /// リージョン (site.kdl の region を上書き)
    #[arg(long, env = "SITE_REGION", global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// リモートの状態を取得し、変更内容を表示
    Plan,
    /// 変更を適用してサイトを公開
    ///
    /// 同じバケットへの同時実行は調整されません
    Apply {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// バケットと関連設定を削除
    Destroy {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 出力値を表示 (bucket_name, bucket_arn, region, website_endpoint, website_url)
    Output {
        /// 出力名（指定しない場合はすべて）
        name: Option<String>,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// 設定を検証
    Validate,
    /// 最後に記録したリソースの状態を表示
    State {
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログは stderr に出力 (stdout は output コマンドの値に使う)
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if cli.verbose {
        filter = filter.add_directive(tracing::Level::DEBUG.into());
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), e);
        for hint in utils::hints(&e) {
            eprintln!("{}", hint.yellow());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = Overrides {
        bucket: cli.bucket,
        region: cli.region,
    };

    match cli.command {
        Commands::Version => {
            println!("siteflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Validate => commands::validate::handle(&overrides),
        Commands::Plan => commands::plan::handle(&overrides).await,
        Commands::Apply { yes } => commands::apply::handle(&overrides, yes).await,
        Commands::Destroy { yes } => commands::destroy::handle(&overrides, yes).await,
        Commands::Output { name, json } => {
            commands::output::handle(&overrides, name.as_deref(), json).await
        }
        Commands::State { json } => commands::state::handle(json).await,
    }
}
