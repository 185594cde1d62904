//! Upload Notifier CLI
//!
//! 回放上传事件脚本、查看通知日志、检查通知配置

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use upload_notifier::{
    cli::{CheckConfigArgs, HistoryArgs, ReplayArgs},
    NotifierSettings,
};

#[derive(Parser)]
#[command(name = "upnotify")]
#[command(about = "Upload Notifier - 上传任务生命周期通知")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按顺序回放事件脚本，驱动生命周期控制器
    Replay(ReplayArgs),
    /// 查看最近的通知记录
    History(HistoryArgs),
    /// 检查通知配置是否完整
    CheckConfig(CheckConfigArgs),
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug upnotify replay ...
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("upload_notifier=info,upnotify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let settings = NotifierSettings::auto_load()?;
    debug!(?settings, "Settings loaded");

    match cli.command {
        Commands::Replay(args) => upload_notifier::cli::handle_replay(args, &settings)?,
        Commands::History(args) => upload_notifier::cli::handle_history(args, &settings)?,
        Commands::CheckConfig(args) => upload_notifier::cli::handle_check_config(args)?,
    }

    Ok(())
}
