//! 展示状态构建 - 把状态配置和任务信息合成不可变的 PresentationState

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

use super::config::{DismissAction, NotificationAction, StatusConfig, StatusKind};
use super::template::{PlaceholderProcessor, TemplateEngine};
use crate::task::{ProgressInfo, TaskInfo};

/// 进度占位符名称
pub const PROGRESS_PLACEHOLDER: &str = "PROGRESS";
/// 已上传字节数占位符
pub const UPLOADED_BYTES_PLACEHOLDER: &str = "UPLOADED_BYTES";
/// 总字节数占位符
pub const TOTAL_BYTES_PLACEHOLDER: &str = "TOTAL_BYTES";

/// 已渲染、可直接展示的通知状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationState {
    /// 来源状态类型
    pub kind: StatusKind,
    /// 通知渠道 ID
    pub channel_id: String,
    pub title: String,
    pub message: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// 分组键
    pub group_key: String,
    /// 常驻（不可被用户划掉）
    pub sticky: bool,
    /// 终态通知是否允许自动清除
    pub auto_clear: bool,
    pub clear_on_action: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_action: Option<DismissAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressInfo>,
}

/// 展示状态构建器
///
/// 纯函数式构建，不持有任何可变状态，可在多个任务之间共享。
#[derive(Clone)]
pub struct PresentationBuilder {
    engine: Arc<dyn TemplateEngine>,
}

impl PresentationBuilder {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    /// 构建展示状态，时间戳取任务创建时间
    pub fn build(
        &self,
        kind: StatusKind,
        status: &StatusConfig,
        task: &TaskInfo,
        group_key: &str,
        sticky: bool,
    ) -> PresentationState {
        self.build_at(kind, status, task, group_key, sticky, task.created_at)
    }

    /// 构建展示状态，使用指定的时间戳
    pub fn build_at(
        &self,
        kind: StatusKind,
        status: &StatusConfig,
        task: &TaskInfo,
        group_key: &str,
        sticky: bool,
        created_at: DateTime<Utc>,
    ) -> PresentationState {
        self.render(kind, status, task, group_key, sticky, created_at, None)
    }

    /// 构建带进度的常驻展示状态
    ///
    /// 进度信息以 `[[PROGRESS]]`、`[[UPLOADED_BYTES]]`、`[[TOTAL_BYTES]]` 占位符提供给模板。
    pub fn build_progress(
        &self,
        status: &StatusConfig,
        task: &TaskInfo,
        group_key: &str,
        progress: ProgressInfo,
    ) -> PresentationState {
        self.render(
            StatusKind::Ongoing,
            status,
            task,
            group_key,
            true,
            task.created_at,
            Some(progress),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn render(
        &self,
        kind: StatusKind,
        status: &StatusConfig,
        task: &TaskInfo,
        group_key: &str,
        sticky: bool,
        created_at: DateTime<Utc>,
        progress: Option<ProgressInfo>,
    ) -> PresentationState {
        let metadata = match progress {
            Some(progress) => {
                let mut metadata = task.metadata.clone();
                metadata.insert(
                    PROGRESS_PLACEHOLDER.to_string(),
                    format!("{}%", progress.percent()),
                );
                metadata.insert(
                    UPLOADED_BYTES_PLACEHOLDER.to_string(),
                    progress.uploaded_bytes.to_string(),
                );
                metadata.insert(
                    TOTAL_BYTES_PLACEHOLDER.to_string(),
                    progress.total_bytes.to_string(),
                );
                Cow::Owned(metadata)
            }
            None => Cow::Borrowed(&task.metadata),
        };

        PresentationState {
            kind,
            channel_id: String::new(),
            title: self.engine.substitute(&status.title, &metadata),
            message: self.engine.substitute(&status.message, &metadata),
            icon: status.icon.clone(),
            large_icon: status.large_icon.clone(),
            color: status.color,
            group_key: group_key.to_string(),
            sticky,
            // 常驻通知不能被自动清除
            auto_clear: !sticky && status.auto_clear,
            clear_on_action: status.clear_on_action,
            created_at,
            dismiss_action: status.dismiss_action.clone(),
            actions: status.actions.clone(),
            progress,
        }
    }
}

impl Default for PresentationBuilder {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderProcessor::new()))
    }
}

impl PresentationState {
    /// 设置渠道 ID（链式调用）
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task() -> TaskInfo {
        TaskInfo::new("upload-1")
            .with_created_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
            .with_metadata("FILE_NAME", "photo.jpg")
    }

    #[test]
    fn test_build_substitutes_templates() {
        let builder = PresentationBuilder::default();
        let status = StatusConfig::new("Uploading [[FILE_NAME]]", "to [[SERVER]]")
            .with_icon("ic_upload")
            .with_color(0xFF00_80FF);

        let state = builder.build(StatusKind::Ongoing, &status, &task(), "group", true);

        assert_eq!(state.title, "Uploading photo.jpg");
        assert_eq!(state.message, "to [[SERVER]]");
        assert_eq!(state.icon, "ic_upload");
        assert_eq!(state.color, Some(0xFF00_80FF));
        assert_eq!(state.group_key, "group");
        assert!(state.sticky);
        assert_eq!(state.created_at, task().created_at);
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PresentationBuilder::default();
        let status = StatusConfig::new("Done", "[[FILE_NAME]] uploaded")
            .with_dismiss_action(DismissAction::new("open"));

        let first = builder.build(StatusKind::Success, &status, &task(), "group", false);
        let second = builder.build(StatusKind::Success, &status, &task(), "group", false);
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_at_only_changes_timestamp() {
        let builder = PresentationBuilder::default();
        let status = StatusConfig::new("Done", "ok");
        let later = Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap();

        let base = builder.build(StatusKind::Success, &status, &task(), "g", false);
        let stamped = builder.build_at(StatusKind::Success, &status, &task(), "g", false, later);

        assert_eq!(stamped.created_at, later);
        assert_eq!(PresentationState { created_at: later, ..base }, stamped);
    }

    #[test]
    fn test_dismiss_action_only_when_declared() {
        let builder = PresentationBuilder::default();

        let without = builder.build(StatusKind::Error, &StatusConfig::new("t", "m"), &task(), "g", false);
        assert!(without.dismiss_action.is_none());

        let status = StatusConfig::new("t", "m").with_dismiss_action(DismissAction::new("retry"));
        let with = builder.build(StatusKind::Error, &status, &task(), "g", false);
        assert_eq!(with.dismiss_action, Some(DismissAction::new("retry")));
    }

    #[test]
    fn test_sticky_state_never_auto_clears() {
        let builder = PresentationBuilder::default();
        let status = StatusConfig::new("t", "m").with_auto_clear(true);

        assert!(!builder.build(StatusKind::Ongoing, &status, &task(), "g", true).auto_clear);
        assert!(builder.build(StatusKind::Success, &status, &task(), "g", false).auto_clear);
    }

    #[test]
    fn test_build_progress_exposes_placeholders() {
        let builder = PresentationBuilder::default();
        let status = StatusConfig::new("[[FILE_NAME]]", "[[PROGRESS]] ([[UPLOADED_BYTES]]/[[TOTAL_BYTES]])");

        let state = builder.build_progress(&status, &task(), "g", ProgressInfo::new(30, 120));

        assert_eq!(state.kind, StatusKind::Ongoing);
        assert!(state.sticky);
        assert_eq!(state.message, "25% (30/120)");
        assert_eq!(state.progress, Some(ProgressInfo::new(30, 120)));
    }
}
