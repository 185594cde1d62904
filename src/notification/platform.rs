//! 平台通知原语 trait 定义
//!
//! 只有 `NotificationDispatcher` 会调用这里的方法。

use super::error::NotifyError;
use super::presentation::PresentationState;
use crate::task::SlotId;

/// 平台通知 trait
pub trait PlatformNotifier: Send + Sync {
    /// 名称（用于日志）
    fn name(&self) -> &str;

    /// 展示或替换槽位上的通知
    fn show(&self, slot: SlotId, state: &PresentationState) -> Result<(), NotifyError>;

    /// 撤回槽位上的通知
    fn cancel(&self, slot: SlotId) -> Result<(), NotifyError>;
}
