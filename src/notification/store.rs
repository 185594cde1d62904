//! 通知日志 - 本地 JSONL 文件读写

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

use super::config::StatusKind;
use super::presentation::PresentationState;
use crate::task::SlotId;

/// 槽位操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    Show,
    Cancel,
}

/// 通知记录（JSONL 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    /// 槽位
    pub slot: SlotId,
    pub action: JournalAction,
    /// 状态类型
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StatusKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky: Option<bool>,
}

impl JournalRecord {
    /// 展示记录
    pub fn show(slot: SlotId, state: &PresentationState) -> Self {
        Self {
            ts: Utc::now(),
            slot,
            action: JournalAction::Show,
            kind: Some(state.kind),
            channel_id: Some(state.channel_id.clone()),
            title: Some(state.title.clone()),
            message: Some(state.message.clone()),
            sticky: Some(state.sticky),
        }
    }

    /// 撤回记录
    pub fn cancel(slot: SlotId) -> Self {
        Self {
            ts: Utc::now(),
            slot,
            action: JournalAction::Cancel,
            kind: None,
            channel_id: None,
            title: None,
            message: None,
            sticky: None,
        }
    }
}

const MAX_RECORDS: usize = 200;
const KEEP_AFTER_CLEANUP: usize = 100;
const CLEANUP_CHECK_INTERVAL: usize = 10;

/// 通知日志
pub struct NotificationJournal {
    path: PathBuf,
    write_count: AtomicUsize,
}

impl NotificationJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_count: AtomicUsize::new(0),
        }
    }

    /// 默认存储路径 `~/.config/upload-notifier/notifications.jsonl`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("upload-notifier")
            .join("notifications.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加记录（带文件锁）
    pub fn append(&self, record: &JournalRecord) -> Result<()> {
        use fs2::FileExt;

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.unlock()?;

        self.maybe_cleanup();

        Ok(())
    }

    /// 读取最近 N 条记录
    pub fn read_recent(&self, n: usize) -> Vec<JournalRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let records = Self::parse(BufReader::new(file));
        let start = records.len().saturating_sub(n);
        let mut recent = records[start..].to_vec();
        recent.sort_by_key(|r| r.ts);
        recent
    }

    fn parse(reader: impl BufRead) -> Vec<JournalRecord> {
        reader
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// 定期检查并清理
    fn maybe_cleanup(&self) {
        let count = self.write_count.fetch_add(1, Ordering::Relaxed);
        if count % CLEANUP_CHECK_INTERVAL != 0 {
            return;
        }

        if let Err(e) = self.trim_if_needed() {
            warn!(path = %self.path.display(), error = %e, "Failed to trim notification journal");
        }
    }

    /// 文件过大时清理，返回是否执行了清理
    fn trim_if_needed(&self) -> Result<bool> {
        let Ok(metadata) = fs::metadata(&self.path) else {
            return Ok(false);
        };
        // 估算行数：平均每行 120 字节
        let estimated_lines = metadata.len() as usize / 120;
        if estimated_lines <= MAX_RECORDS {
            return Ok(false);
        }
        self.cleanup()?;
        Ok(true)
    }

    /// 执行清理（保留最近的记录）
    fn cleanup(&self) -> Result<()> {
        use fs2::FileExt;

        let file = File::open(&self.path)?;
        file.lock_exclusive()?;

        let records = Self::parse(BufReader::new(&file));
        if records.len() <= MAX_RECORDS {
            file.unlock()?;
            return Ok(());
        }

        let start = records.len().saturating_sub(KEEP_AFTER_CLEANUP);
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for record in &records[start..] {
                writeln!(temp_file, "{}", serde_json::to_string(record)?)?;
            }
        }

        // 原子替换
        fs::rename(&temp_path, &self.path)?;

        file.unlock()?;
        Ok(())
    }
}
