//! 生命周期控制器 - 把一个上传任务的生命周期事件转换为通知槽位的展示状态
//!
//! 状态机：`Idle -> Started -> {Succeeded, Failed, Cancelled} -> Completed`。
//! 顺序错误的事件会被报告为 `ProtocolViolation`，之后控制器冻结，
//! 不再对该任务的槽位做任何修改。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::arbiter::{ExecutionOwner, Ownership, OwnershipArbiter};
use super::channel::ChannelValidator;
use super::config::{NotificationConfig, StatusConfig, StatusKind};
use super::dispatcher::NotificationDispatcher;
use super::error::NotifyError;
use super::presentation::{PresentationBuilder, PresentationState};
use super::resolver::{resolve, EventKind};
use super::template::TemplateEngine;
use crate::task::{FailureCause, ProgressInfo, SlotId, TaskInfo};

/// 默认分组键
pub const DEFAULT_GROUP_KEY: &str = "upload_notifier_group";

/// 控制器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Started,
    Succeeded,
    Failed,
    Cancelled,
    Completed,
    /// 发生协议违例或致命错误后冻结
    Frozen,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Started => "started",
            LifecycleState::Succeeded => "succeeded",
            LifecycleState::Failed => "failed",
            LifecycleState::Cancelled => "cancelled",
            LifecycleState::Completed => "completed",
            LifecycleState::Frozen => "frozen",
        }
    }

    /// 是否处于终态事件之后、completed 之前
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Succeeded | LifecycleState::Failed | LifecycleState::Cancelled
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单个事件的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 控制器展示了通知
    Displayed(StatusKind),
    /// 执行方接管，控制器撤回了槽位
    Suppressed(StatusKind),
    /// 缺少终态配置，槽位被撤回
    Withdrawn,
    /// 槽位没有变化
    Unchanged,
    /// 平台调用失败，状态迁移照常进行
    Degraded(NotifyError),
}

/// 所有任务共享的依赖
#[derive(Clone)]
pub struct ControllerContext {
    validator: Arc<dyn ChannelValidator>,
    arbiter: OwnershipArbiter,
    builder: PresentationBuilder,
    dispatcher: Arc<NotificationDispatcher>,
    group_key: String,
}

impl ControllerContext {
    pub fn new(
        validator: Arc<dyn ChannelValidator>,
        owner: Arc<dyn ExecutionOwner>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            validator,
            arbiter: OwnershipArbiter::new(owner),
            builder: PresentationBuilder::default(),
            dispatcher,
            group_key: DEFAULT_GROUP_KEY.to_string(),
        }
    }

    /// 设置模板引擎
    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.builder = PresentationBuilder::new(engine);
        self
    }

    /// 设置所有权仲裁超时
    pub fn with_ownership_timeout(mut self, timeout: Duration) -> Self {
        self.arbiter = self.arbiter.with_timeout(timeout);
        self
    }

    /// 设置默认分组键
    pub fn with_group_key(mut self, group_key: impl Into<String>) -> Self {
        self.group_key = group_key.into();
        self
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    /// 为一个新任务创建控制器
    pub fn controller(&self) -> LifecycleController {
        LifecycleController::new(self.clone())
    }
}

/// 单个任务的生命周期控制器
///
/// 只能由一个有序事件流驱动（`&mut self`）。
pub struct LifecycleController {
    ctx: ControllerContext,
    state: LifecycleState,
    task: Option<TaskInfo>,
    slot: Option<SlotId>,
    /// 上一个终态及其配置，用于 completed 判断是否重新展示或恢复终态通知
    last_terminal: Option<(StatusKind, StatusConfig)>,
}

impl LifecycleController {
    pub fn new(ctx: ControllerContext) -> Self {
        Self {
            ctx,
            state: LifecycleState::Idle,
            task: None,
            slot: None,
            last_terminal: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == LifecycleState::Frozen
    }

    /// 绑定的任务（completed 之后释放）
    pub fn task(&self) -> Option<&TaskInfo> {
        self.task.as_ref()
    }

    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    /// 任务开始：校验渠道，展示常驻通知
    pub fn on_start(
        &mut self,
        task: TaskInfo,
        slot: SlotId,
        config: &NotificationConfig,
    ) -> Result<Outcome, NotifyError> {
        self.expect_state(EventKind::Start, &[LifecycleState::Idle])?;

        if let Err(e) = self.ctx.validator.ensure_channel_valid(&config.channel_id) {
            warn!(task_id = %task.task_id, channel = %config.channel_id, error = %e, "Channel validation failed");
            self.freeze();
            return Err(e);
        }

        let (kind, status) = match resolve(EventKind::Start, None, config) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "Ongoing status config missing");
                self.freeze();
                return Err(e);
            }
        };

        info!(task_id = %task.task_id, slot = %slot, "Upload started");
        let candidate = self
            .ctx
            .builder
            .build(kind, status, &task, self.group_key(config), true)
            .with_channel(&config.channel_id);

        self.task = Some(task);
        self.slot = Some(slot);
        let outcome = self.present(candidate);
        self.state = LifecycleState::Started;
        Ok(outcome)
    }

    /// 上传进度
    ///
    /// 默认不改变展示；配置开启 `progress_updates` 时刷新常驻通知。
    pub fn on_progress(
        &mut self,
        task_id: &str,
        slot: SlotId,
        config: &NotificationConfig,
        progress: ProgressInfo,
    ) -> Result<Outcome, NotifyError> {
        self.expect_state(EventKind::Progress, &[LifecycleState::Started])?;
        self.expect_binding(EventKind::Progress, task_id, slot)?;

        if !config.progress_updates {
            return Ok(Outcome::Unchanged);
        }

        let status = match resolve(EventKind::Progress, None, config) {
            Ok((_, status)) => status,
            Err(e) => {
                debug!(task_id = %task_id, error = %e, "Skipping progress update");
                return Ok(Outcome::Unchanged);
            }
        };

        let candidate = match self.task.as_ref() {
            Some(task) => self
                .ctx
                .builder
                .build_progress(status, task, self.group_key(config), progress)
                .with_channel(&config.channel_id),
            None => return Ok(Outcome::Unchanged),
        };
        Ok(self.present(candidate))
    }

    /// 上传成功
    pub fn on_success(
        &mut self,
        task_id: &str,
        slot: SlotId,
        config: &NotificationConfig,
    ) -> Result<Outcome, NotifyError> {
        self.expect_state(EventKind::Success, &[LifecycleState::Started])?;
        self.expect_binding(EventKind::Success, task_id, slot)?;

        info!(task_id = %task_id, slot = %slot, "Upload succeeded");
        let outcome = self.present_terminal(EventKind::Success, None, config);
        self.state = LifecycleState::Succeeded;
        Ok(outcome)
    }

    /// 上传失败（含用户取消）
    pub fn on_error(
        &mut self,
        task_id: &str,
        slot: SlotId,
        config: &NotificationConfig,
        cause: &FailureCause,
    ) -> Result<Outcome, NotifyError> {
        self.expect_state(EventKind::Error, &[LifecycleState::Started])?;
        self.expect_binding(EventKind::Error, task_id, slot)?;

        info!(task_id = %task_id, slot = %slot, cause = %cause, "Upload failed");
        let outcome = self.present_terminal(EventKind::Error, Some(cause), config);
        self.state = if cause.is_cancellation() {
            LifecycleState::Cancelled
        } else {
            LifecycleState::Failed
        };
        Ok(outcome)
    }

    /// 任务结束
    ///
    /// completed 配置存在且与上一个终态配置不同时才重新展示；
    /// 否则保留终态通知，只重新询问执行方是否接管。
    pub fn on_completed(
        &mut self,
        task_id: &str,
        slot: SlotId,
        config: &NotificationConfig,
    ) -> Result<Outcome, NotifyError> {
        self.expect_state(
            EventKind::Completed,
            &[
                LifecycleState::Succeeded,
                LifecycleState::Failed,
                LifecycleState::Cancelled,
            ],
        )?;
        self.expect_binding(EventKind::Completed, task_id, slot)?;

        let distinct = config
            .completed
            .as_ref()
            .filter(|status| self.last_terminal.as_ref().map(|(_, s)| s) != Some(*status));

        let outcome = match (distinct, self.task.as_ref()) {
            (Some(status), Some(task)) => {
                let candidate = self
                    .ctx
                    .builder
                    .build(StatusKind::Completed, status, task, self.group_key(config), false)
                    .with_channel(&config.channel_id);
                self.present(candidate)
            }
            _ => self.rearbitrate_live(task_id, slot, config),
        };

        info!(task_id = %task_id, slot = %slot, "Upload completed");
        self.state = LifecycleState::Completed;
        self.task = None;
        self.last_terminal = None;
        Ok(outcome)
    }

    fn present_terminal(
        &mut self,
        event: EventKind,
        cause: Option<&FailureCause>,
        config: &NotificationConfig,
    ) -> Outcome {
        let resolved = resolve(event, cause, config);
        let (kind, status) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                // 终态配置缺失：撤回槽位，不中断生命周期
                warn!(event = %event, error = %e, "Terminal status config missing, withdrawing slot");
                self.last_terminal = None;
                return self.withdraw_slot().map_or_else(Outcome::Degraded, |_| Outcome::Withdrawn);
            }
        };

        let candidate = match self.task.as_ref() {
            Some(task) => self
                .ctx
                .builder
                .build(kind, status, task, self.group_key(config), false)
                .with_channel(&config.channel_id),
            None => return Outcome::Unchanged,
        };
        self.last_terminal = Some((kind, status.clone()));
        self.present(candidate)
    }

    /// 仲裁并发送：每个事件最多调用一次分发器
    fn present(&self, candidate: PresentationState) -> Outcome {
        let (Some(task), Some(slot)) = (self.task.as_ref(), self.slot) else {
            return Outcome::Unchanged;
        };
        let kind = candidate.kind;

        match self.ctx.arbiter.decide_owner(&task.task_id, &candidate) {
            Ownership::Controller => match self.ctx.dispatcher.emit(slot, candidate) {
                Ok(()) => Outcome::Displayed(kind),
                Err(e) => Outcome::Degraded(e),
            },
            Ownership::External => {
                debug!(task_id = %task.task_id, slot = %slot, kind = %kind, "Execution owner took over slot");
                match self.ctx.dispatcher.withdraw(slot) {
                    Ok(_) => Outcome::Suppressed(kind),
                    Err(e) => Outcome::Degraded(e),
                }
            }
        }
    }

    /// 对当前展示的通知重新仲裁，执行方接管时撤回
    ///
    /// 槽位上没有终态通知时（执行方接管后又释放，或终态发送失败），
    /// 按上一个终态配置重新仲裁并展示。
    fn rearbitrate_live(&self, task_id: &str, slot: SlotId, config: &NotificationConfig) -> Outcome {
        let live = self
            .ctx
            .dispatcher
            .live_state(slot)
            .filter(|live| !live.sticky);
        let Some(live) = live else {
            return self.restore_terminal(config);
        };

        match self.ctx.arbiter.decide_owner(task_id, &live) {
            Ownership::Controller => Outcome::Unchanged,
            Ownership::External => match self.ctx.dispatcher.withdraw(slot) {
                Ok(_) => Outcome::Suppressed(live.kind),
                Err(e) => Outcome::Degraded(e),
            },
        }
    }

    /// 重新展示上一个终态通知
    fn restore_terminal(&self, config: &NotificationConfig) -> Outcome {
        let (Some((kind, status)), Some(task)) = (self.last_terminal.as_ref(), self.task.as_ref())
        else {
            return Outcome::Unchanged;
        };

        debug!(task_id = %task.task_id, kind = %kind, "Restoring terminal notification");
        let candidate = self
            .ctx
            .builder
            .build(*kind, status, task, self.group_key(config), false)
            .with_channel(&config.channel_id);
        self.present(candidate)
    }

    fn withdraw_slot(&self) -> Result<bool, NotifyError> {
        match self.slot {
            Some(slot) => self.ctx.dispatcher.withdraw(slot),
            None => Ok(false),
        }
    }

    fn group_key<'a>(&'a self, config: &'a NotificationConfig) -> &'a str {
        config.group_key.as_deref().unwrap_or(&self.ctx.group_key)
    }

    fn expect_state(
        &mut self,
        event: EventKind,
        allowed: &[LifecycleState],
    ) -> Result<(), NotifyError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }

        let state = self.state;
        if state != LifecycleState::Frozen {
            warn!(event = %event, state = %state, "Lifecycle protocol violation, freezing controller");
            self.freeze();
        }
        Err(NotifyError::ProtocolViolation { event, state })
    }

    /// 事件必须属于绑定的任务和槽位
    fn expect_binding(
        &mut self,
        event: EventKind,
        task_id: &str,
        slot: SlotId,
    ) -> Result<(), NotifyError> {
        let task_matches = self.task.as_ref().is_some_and(|t| t.task_id == task_id);
        if task_matches && self.slot == Some(slot) {
            return Ok(());
        }

        let state = self.state;
        warn!(
            event = %event,
            task_id = %task_id,
            slot = %slot,
            bound_slot = ?self.slot,
            "Event does not belong to this controller, freezing"
        );
        self.freeze();
        Err(NotifyError::ProtocolViolation { event, state })
    }

    fn freeze(&mut self) {
        self.state = LifecycleState::Frozen;
    }
}
