//! 上传任务数据 - 任务标识、通知槽位、失败原因与进度

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 通知槽位 ID（一个任务在整个生命周期内只对应一个槽位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub i32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SlotId {
    fn from(id: i32) -> Self {
        SlotId(id)
    }
}

/// 上传任务信息（创建后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// 任务 ID
    pub task_id: String,
    /// 创建时间，所有通知共用此时间戳
    pub created_at: DateTime<Utc>,
    /// 模板占位符使用的元数据
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TaskInfo {
    /// 创建任务信息，创建时间取当前时间
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// 设置创建时间
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// 添加一条元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 失败原因（每个 error 事件只分类一次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum FailureCause {
    /// 用户主动取消
    UserCancelled,
    /// 其他失败
    Other(String),
}

impl FailureCause {
    pub fn other(message: impl Into<String>) -> Self {
        FailureCause::Other(message.into())
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, FailureCause::UserCancelled)
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::UserCancelled => write!(f, "cancelled by user"),
            FailureCause::Other(message) => write!(f, "{}", message),
        }
    }
}

/// 上传进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
}

impl ProgressInfo {
    pub fn new(uploaded_bytes: u64, total_bytes: u64) -> Self {
        Self {
            uploaded_bytes,
            total_bytes,
        }
    }

    /// 完成百分比（0-100），总大小未知时为 0
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 0;
        }
        let uploaded = self.uploaded_bytes.min(self.total_bytes);
        ((uploaded as u128 * 100) / self.total_bytes as u128) as u8
    }
}
