//! Check-config 命令 - 检查通知配置是否完整

use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;

use crate::notification::config::{NotificationConfig, StatusKind};
use crate::settings::load_notification_config;

/// Check-config 命令参数
#[derive(Args)]
pub struct CheckConfigArgs {
    /// 通知配置文件（JSON）
    #[arg(long, short)]
    pub config: PathBuf,
}

/// 配置检查结果
#[derive(Debug, PartialEq)]
pub struct ConfigReport {
    pub present: Vec<StatusKind>,
    pub missing: Vec<StatusKind>,
    /// 缺少 ongoing 时 start 会直接失败
    pub startable: bool,
}

pub fn inspect(config: &NotificationConfig) -> ConfigReport {
    let missing = config.missing_kinds();
    let present = StatusKind::ALL
        .into_iter()
        .filter(|kind| !missing.contains(kind))
        .collect();
    ConfigReport {
        present,
        startable: config.ongoing.is_some() && !config.channel_id.trim().is_empty(),
        missing,
    }
}

/// 处理 check-config 命令
pub fn handle_check_config(args: CheckConfigArgs) -> Result<()> {
    let config = load_notification_config(&args.config)?;
    let report = inspect(&config);

    println!("渠道: {}", config.channel_id);
    for kind in &report.present {
        println!("  ✓ {}", kind);
    }
    for kind in &report.missing {
        println!("  ✗ {}", kind);
    }

    if !report.startable {
        return Err(anyhow!("配置无法启动任务：需要非空 channel_id 和 ongoing 配置"));
    }
    Ok(())
}
