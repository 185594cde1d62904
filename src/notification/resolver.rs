//! 状态配置解析 - 根据生命周期事件选择适用的 StatusConfig

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::{NotificationConfig, StatusConfig, StatusKind};
use super::error::NotifyError;
use crate::task::FailureCause;

/// 生命周期事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Progress,
    Success,
    Error,
    Completed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Progress => "progress",
            EventKind::Success => "success",
            EventKind::Error => "error",
            EventKind::Completed => "completed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 事件对应的状态类型
///
/// error 事件按失败原因区分：用户取消走 `Cancelled`，其余走 `Error`。
pub fn status_kind_for(event: EventKind, cause: Option<&FailureCause>) -> StatusKind {
    match event {
        EventKind::Start | EventKind::Progress => StatusKind::Ongoing,
        EventKind::Success => StatusKind::Success,
        EventKind::Error => match cause {
            Some(cause) if cause.is_cancellation() => StatusKind::Cancelled,
            _ => StatusKind::Error,
        },
        EventKind::Completed => StatusKind::Completed,
    }
}

/// 选择事件适用的状态配置
///
/// 配置集合中缺少对应变体时返回 `ConfigurationMissing`，由调用方决定如何处理。
pub fn resolve<'a>(
    event: EventKind,
    cause: Option<&FailureCause>,
    config: &'a NotificationConfig,
) -> Result<(StatusKind, &'a StatusConfig), NotifyError> {
    let kind = status_kind_for(event, cause);
    config
        .get(kind)
        .map(|status| (kind, status))
        .ok_or(NotifyError::ConfigurationMissing { kind })
}
