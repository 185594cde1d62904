//! 通知渠道校验 trait 定义

use std::collections::HashSet;
use std::sync::RwLock;
use tracing::info;

use super::error::NotifyError;

/// 渠道校验 trait（每个任务 start 时调用一次）
pub trait ChannelValidator: Send + Sync {
    fn ensure_channel_valid(&self, channel_id: &str) -> Result<(), NotifyError>;
}

/// 内存中的渠道注册表
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashSet<String>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一组渠道 ID 创建注册表
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: RwLock::new(channels.into_iter().map(Into::into).collect()),
        }
    }

    /// 注册渠道
    pub fn register(&self, channel_id: impl Into<String>) {
        let channel_id = channel_id.into();
        info!(channel = %channel_id, "Registering notification channel");
        self.channels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel_id);
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(channel_id)
    }
}

impl ChannelValidator for ChannelRegistry {
    fn ensure_channel_valid(&self, channel_id: &str) -> Result<(), NotifyError> {
        if !channel_id.trim().is_empty() && self.contains(channel_id) {
            Ok(())
        } else {
            Err(NotifyError::ChannelInvalid {
                channel_id: channel_id.to_string(),
            })
        }
    }
}
