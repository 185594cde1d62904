//! Upload Notifier - 上传任务生命周期通知控制器

pub mod cli;
pub mod notification;
pub mod settings;
pub mod task;

pub use notification::{
    ChannelRegistry, ChannelValidator, ConsoleNotifier, ControllerContext, EventKind,
    ExecutionOwner, LifecycleController, LifecycleState, LocalFileNotifier, NeverOwns,
    NotificationConfig, NotificationDispatcher, NotificationJournal, NotifyError, Outcome,
    Ownership, OwnershipArbiter, PlaceholderProcessor, PlatformNotifier, PresentationBuilder,
    PresentationState, StatusConfig, StatusKind, TemplateEngine,
};
pub use settings::NotifierSettings;
pub use task::{FailureCause, ProgressInfo, SlotId, TaskInfo};
