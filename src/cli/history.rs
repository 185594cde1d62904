//! History 命令 - 查看本地通知日志

use anyhow::Result;
use clap::Args;

use crate::notification::store::{JournalAction, JournalRecord, NotificationJournal};
use crate::settings::NotifierSettings;

/// History 命令参数
#[derive(Args)]
pub struct HistoryArgs {
    /// 显示最近 N 条记录
    #[arg(long, short, default_value = "20")]
    pub limit: usize,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 处理 history 命令
pub fn handle_history(args: HistoryArgs, settings: &NotifierSettings) -> Result<()> {
    let journal = NotificationJournal::new(settings.journal_path());
    let records = journal.read_recent(args.limit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("没有通知记录 ({})", journal.path().display());
        return Ok(());
    }

    println!("最近 {} 条通知记录:\n", records.len());
    for record in &records {
        println!("  {}", format_record(record));
    }
    Ok(())
}

/// 格式化一条日志记录
pub fn format_record(record: &JournalRecord) -> String {
    let ts = record.ts.format("%Y-%m-%d %H:%M:%S");
    match record.action {
        JournalAction::Show => format!(
            "{} | slot {} | {} | {}",
            ts,
            record.slot,
            record.kind.map(|k| k.as_str()).unwrap_or("-"),
            record.title.as_deref().unwrap_or("")
        ),
        JournalAction::Cancel => format!("{} | slot {} | cancelled", ts, record.slot),
    }
}
