//! 运行配置
//!
//! 读取优先级：
//! 1. 环境变量 `UPLOAD_NOTIFIER_OWNERSHIP_TIMEOUT_MS`（只覆盖仲裁超时）
//! 2. 配置文件 `~/.config/upload-notifier/config.json`
//! 3. 默认值

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::notification::arbiter::DEFAULT_OWNERSHIP_TIMEOUT;
use crate::notification::config::NotificationConfig;
use crate::notification::controller::DEFAULT_GROUP_KEY;
use crate::notification::store::NotificationJournal;

/// 仲裁超时环境变量
pub const OWNERSHIP_TIMEOUT_ENV: &str = "UPLOAD_NOTIFIER_OWNERSHIP_TIMEOUT_MS";

/// 运行配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierSettings {
    /// 所有权仲裁超时（毫秒），0 表示不设超时
    pub ownership_timeout_ms: u64,
    /// 默认分组键
    pub group_key: String,
    /// 通知日志路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<PathBuf>,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            ownership_timeout_ms: DEFAULT_OWNERSHIP_TIMEOUT.as_millis() as u64,
            group_key: DEFAULT_GROUP_KEY.to_string(),
            journal_path: None,
        }
    }
}

impl NotifierSettings {
    /// 配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/upload-notifier/config.json"))
    }

    /// 从配置文件和环境变量加载
    pub fn auto_load() -> Result<Self> {
        let mut settings = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        settings.apply_env(std::env::var(OWNERSHIP_TIMEOUT_ENV).ok().as_deref());
        Ok(settings)
    }

    /// 从指定文件加载
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        debug!(path = %path.display(), "Loaded notifier settings");
        Ok(settings)
    }

    fn apply_env(&mut self, timeout_ms: Option<&str>) {
        let Some(raw) = timeout_ms else {
            return;
        };
        match raw.trim().parse::<u64>() {
            Ok(ms) => self.ownership_timeout_ms = ms,
            Err(_) => warn!(value = %raw, "Ignoring invalid {}", OWNERSHIP_TIMEOUT_ENV),
        }
    }

    pub fn ownership_timeout(&self) -> Duration {
        Duration::from_millis(self.ownership_timeout_ms)
    }

    /// 通知日志路径（未配置时使用默认路径）
    pub fn journal_path(&self) -> PathBuf {
        self.journal_path
            .clone()
            .unwrap_or_else(NotificationJournal::default_path)
    }
}

/// 加载一个任务的通知配置
pub fn load_notification_config(path: &Path) -> Result<NotificationConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid notification config in {}", path.display()))
}
