//! 通知层 - 上传任务生命周期通知
//!
//! # 组成
//! 1. `resolver`：根据事件和失败原因选择状态配置
//! 2. `presentation`：把状态配置和任务信息组装成展示状态
//! 3. `arbiter`：决定通知归控制器还是外部执行所有者
//! 4. `dispatcher`：按槽位串行调用平台通知原语
//! 5. `controller`：每个任务一个生命周期状态机
//!
//! # 使用示例
//! ```ignore
//! use upload_notifier::notification::*;
//!
//! let ctx = ControllerContext::new(validator, Arc::new(NeverOwns), dispatcher);
//! let mut controller = ctx.controller();
//! controller.on_start(task, SlotId(1), &config)?;
//! ```

pub mod arbiter;
pub mod channel;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod notifiers;
pub mod platform;
pub mod presentation;
pub mod resolver;
pub mod store;
pub mod template;

pub use arbiter::{ExecutionOwner, NeverOwns, Ownership, OwnershipArbiter, DEFAULT_OWNERSHIP_TIMEOUT};
pub use channel::{ChannelRegistry, ChannelValidator};
pub use config::{DismissAction, NotificationAction, NotificationConfig, StatusConfig, StatusKind};
pub use controller::{ControllerContext, LifecycleController, LifecycleState, Outcome, DEFAULT_GROUP_KEY};
pub use dispatcher::NotificationDispatcher;
pub use error::NotifyError;
pub use notifiers::{ConsoleNotifier, LocalFileNotifier};
pub use platform::PlatformNotifier;
pub use presentation::{PresentationBuilder, PresentationState};
pub use resolver::{resolve, status_kind_for, EventKind};
pub use store::{JournalAction, JournalRecord, NotificationJournal};
pub use template::{PlaceholderProcessor, TemplateEngine};
