//! 通知生命周期错误类型

use thiserror::Error;

use super::config::StatusKind;
use super::controller::LifecycleState;
use super::resolver::EventKind;

/// 通知错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// 缺少状态配置
    #[error("status config for {kind} is missing")]
    ConfigurationMissing { kind: StatusKind },

    /// 渠道无效（致命）
    #[error("notification channel {channel_id:?} is not valid")]
    ChannelInvalid { channel_id: String },

    /// 平台通知不可用，不重试
    #[error("platform notifier unavailable: {0}")]
    PlatformUnavailable(String),

    /// 事件顺序错误，控制器冻结
    #[error("{event} event is not allowed in state {state}")]
    ProtocolViolation { event: EventKind, state: LifecycleState },
}

impl NotifyError {
    pub fn platform(detail: impl Into<String>) -> Self {
        NotifyError::PlatformUnavailable(detail.into())
    }

    /// 是否为协议违例（控制器会因此冻结）
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, NotifyError::ProtocolViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let missing = NotifyError::ConfigurationMissing {
            kind: StatusKind::Ongoing,
        };
        assert_eq!(missing.to_string(), "status config for ongoing is missing");

        let violation = NotifyError::ProtocolViolation {
            event: EventKind::Completed,
            state: LifecycleState::Idle,
        };
        assert_eq!(violation.to_string(), "completed event is not allowed in state idle");
        assert!(violation.is_protocol_violation());

        let platform = NotifyError::platform("offline");
        assert_eq!(platform.to_string(), "platform notifier unavailable: offline");
        assert!(!platform.is_protocol_violation());
    }
}
