//! 通知配置 - 每个状态的样式描述及按事件类型组织的配置集合

use serde::{Deserialize, Serialize};
use std::fmt;

/// 状态配置的变体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Ongoing,
    Success,
    Error,
    Cancelled,
    Completed,
}

impl StatusKind {
    pub const ALL: [StatusKind; 5] = [
        StatusKind::Ongoing,
        StatusKind::Success,
        StatusKind::Error,
        StatusKind::Cancelled,
        StatusKind::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Ongoing => "ongoing",
            StatusKind::Success => "success",
            StatusKind::Error => "error",
            StatusKind::Cancelled => "cancelled",
            StatusKind::Completed => "completed",
        }
    }

    /// 是否为终态（终态通知不常驻）
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusKind::Ongoing)
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 用户划掉通知时触发的动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissAction {
    /// 动作 ID（由宿主应用解释）
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl DismissAction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// 通知上的按钮
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub label: String,
}

impl NotificationAction {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// 单个状态的样式配置（调用方提供，只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// 标题模板
    pub title: String,
    /// 正文模板
    pub message: String,
    /// 小图标引用
    #[serde(default)]
    pub icon: String,
    /// 大图引用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_icon: Option<String>,
    /// 强调色（ARGB）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// 划掉时的动作
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_action: Option<DismissAction>,
    /// 终态通知是否允许平台自动清除
    #[serde(default)]
    pub auto_clear: bool,
    /// 点击后是否清除
    #[serde(default)]
    pub clear_on_action: bool,
    /// 按钮列表
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

impl StatusConfig {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            icon: String::new(),
            large_icon: None,
            color: None,
            dismiss_action: None,
            auto_clear: false,
            clear_on_action: false,
            actions: Vec::new(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_large_icon(mut self, large_icon: impl Into<String>) -> Self {
        self.large_icon = Some(large_icon.into());
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_dismiss_action(mut self, action: DismissAction) -> Self {
        self.dismiss_action = Some(action);
        self
    }

    pub fn with_auto_clear(mut self, auto_clear: bool) -> Self {
        self.auto_clear = auto_clear;
        self
    }

    pub fn with_clear_on_action(mut self, clear_on_action: bool) -> Self {
        self.clear_on_action = clear_on_action;
        self
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// 一个任务的通知配置集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 通知渠道 ID
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ongoing: Option<StatusConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<StatusConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StatusConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<StatusConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<StatusConfig>,
    /// progress 事件是否刷新常驻通知
    #[serde(default)]
    pub progress_updates: bool,
    /// 覆盖默认的分组键
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
}

impl NotificationConfig {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            ongoing: None,
            success: None,
            error: None,
            cancelled: None,
            completed: None,
            progress_updates: false,
            group_key: None,
        }
    }

    /// 设置某个状态的配置（链式调用）
    pub fn with_status(mut self, kind: StatusKind, config: StatusConfig) -> Self {
        *self.slot_mut(kind) = Some(config);
        self
    }

    pub fn with_progress_updates(mut self, enabled: bool) -> Self {
        self.progress_updates = enabled;
        self
    }

    pub fn with_group_key(mut self, group_key: impl Into<String>) -> Self {
        self.group_key = Some(group_key.into());
        self
    }

    /// 获取某个状态的配置
    pub fn get(&self, kind: StatusKind) -> Option<&StatusConfig> {
        match kind {
            StatusKind::Ongoing => self.ongoing.as_ref(),
            StatusKind::Success => self.success.as_ref(),
            StatusKind::Error => self.error.as_ref(),
            StatusKind::Cancelled => self.cancelled.as_ref(),
            StatusKind::Completed => self.completed.as_ref(),
        }
    }

    /// 缺失的状态配置
    pub fn missing_kinds(&self) -> Vec<StatusKind> {
        StatusKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_none())
            .collect()
    }

    fn slot_mut(&mut self, kind: StatusKind) -> &mut Option<StatusConfig> {
        match kind {
            StatusKind::Ongoing => &mut self.ongoing,
            StatusKind::Success => &mut self.success,
            StatusKind::Error => &mut self.error,
            StatusKind::Cancelled => &mut self.cancelled,
            StatusKind::Completed => &mut self.completed,
        }
    }
}
