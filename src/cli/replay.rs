//! Replay 命令 - 按脚本重放上传生命周期事件
//!
//! 脚本为 JSONL，每行一个事件：
//! ```text
//! {"event":"start","task_id":"upload-1","slot":1,"metadata":{"FILE_NAME":"a.jpg"}}
//! {"event":"progress","task_id":"upload-1","uploaded_bytes":10,"total_bytes":100}
//! {"event":"error","task_id":"upload-1","cause":{"type":"user_cancelled"}}
//! {"event":"completed","task_id":"upload-1"}
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::notification::arbiter::ExecutionOwner;
use crate::notification::channel::ChannelRegistry;
use crate::notification::config::NotificationConfig;
use crate::notification::controller::{ControllerContext, LifecycleController, Outcome};
use crate::notification::dispatcher::NotificationDispatcher;
use crate::notification::error::NotifyError;
use crate::notification::notifiers::{ConsoleNotifier, LocalFileNotifier};
use crate::notification::platform::PlatformNotifier;
use crate::notification::presentation::PresentationState;
use crate::settings::{load_notification_config, NotifierSettings};
use crate::task::{FailureCause, ProgressInfo, SlotId, TaskInfo};

/// Replay 命令参数
#[derive(Args)]
pub struct ReplayArgs {
    /// 通知配置文件（JSON）
    #[arg(long, short)]
    pub config: PathBuf,

    /// 事件脚本（JSONL）
    #[arg(long, short)]
    pub events: PathBuf,

    /// 写入本地通知日志而不是终端
    #[arg(long)]
    pub journal: bool,

    /// 从第 N 个事件（从 0 开始）起由前台执行方接管展示
    #[arg(long)]
    pub claim_from: Option<usize>,

    /// Dry-run 模式（不调用平台通知）
    #[arg(long)]
    pub dry_run: bool,
}

/// 脚本中的一个事件
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Start {
        task_id: String,
        slot: SlotId,
        #[serde(default)]
        metadata: BTreeMap<String, String>,
    },
    Progress {
        task_id: String,
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    Success {
        task_id: String,
    },
    Error {
        task_id: String,
        cause: FailureCause,
    },
    Completed {
        task_id: String,
    },
}

impl ScriptEvent {
    pub fn task_id(&self) -> &str {
        match self {
            ScriptEvent::Start { task_id, .. }
            | ScriptEvent::Progress { task_id, .. }
            | ScriptEvent::Success { task_id }
            | ScriptEvent::Error { task_id, .. }
            | ScriptEvent::Completed { task_id } => task_id,
        }
    }
}

/// 解析事件脚本（忽略空行和 `#` 注释行）
pub fn parse_script(content: &str) -> Result<Vec<ScriptEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid event on line {}", idx + 1))
        })
        .collect()
}

/// 从某个事件序号起接管展示的执行方
struct ScriptedOwner {
    claim_from: Option<usize>,
    cursor: Arc<AtomicUsize>,
}

impl ExecutionOwner for ScriptedOwner {
    fn wants_ownership(&self, _task_id: &str, _candidate: &PresentationState) -> bool {
        self.claim_from
            .is_some_and(|from| self.cursor.load(Ordering::SeqCst) >= from)
    }
}

/// 单个事件的重放结果
#[derive(Debug)]
pub struct ReplayStep {
    pub index: usize,
    pub task_id: String,
    pub event: &'static str,
    pub result: Result<Outcome, NotifyError>,
}

/// 事件重放器，每个任务一个控制器
pub struct Replayer {
    ctx: ControllerContext,
    controllers: HashMap<String, LifecycleController>,
    cursor: Arc<AtomicUsize>,
}

impl Replayer {
    pub fn new(
        notifier: Arc<dyn PlatformNotifier>,
        settings: &NotifierSettings,
        channel_id: &str,
        claim_from: Option<usize>,
        dry_run: bool,
    ) -> Self {
        let cursor = Arc::new(AtomicUsize::new(0));
        let owner = ScriptedOwner {
            claim_from,
            cursor: Arc::clone(&cursor),
        };
        let dispatcher = Arc::new(NotificationDispatcher::new(notifier).with_dry_run(dry_run));
        let ctx = ControllerContext::new(
            Arc::new(ChannelRegistry::with_channels([channel_id])),
            Arc::new(owner),
            dispatcher,
        )
        .with_ownership_timeout(settings.ownership_timeout())
        .with_group_key(&settings.group_key);

        Self {
            ctx,
            controllers: HashMap::new(),
            cursor,
        }
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        self.ctx.dispatcher()
    }

    /// 重放一个事件
    pub fn step(
        &mut self,
        index: usize,
        event: &ScriptEvent,
        config: &NotificationConfig,
    ) -> ReplayStep {
        self.cursor.store(index, Ordering::SeqCst);
        let task_id = event.task_id().to_string();

        let (name, result) = match event {
            ScriptEvent::Start {
                task_id,
                slot,
                metadata,
            } => {
                let mut task = TaskInfo::new(task_id.clone());
                task.metadata = metadata.clone();
                let ctx = &self.ctx;
                let controller = self
                    .controllers
                    .entry(task_id.clone())
                    .or_insert_with(|| ctx.controller());
                ("start", controller.on_start(task, *slot, config))
            }
            ScriptEvent::Progress {
                uploaded_bytes,
                total_bytes,
                ..
            } => (
                "progress",
                self.with_controller(&task_id, |c, slot| {
                    c.on_progress(&task_id, slot, config, ProgressInfo::new(*uploaded_bytes, *total_bytes))
                }),
            ),
            ScriptEvent::Success { .. } => (
                "success",
                self.with_controller(&task_id, |c, slot| c.on_success(&task_id, slot, config)),
            ),
            ScriptEvent::Error { cause, .. } => (
                "error",
                self.with_controller(&task_id, |c, slot| c.on_error(&task_id, slot, config, cause)),
            ),
            ScriptEvent::Completed { .. } => (
                "completed",
                self.with_controller(&task_id, |c, slot| c.on_completed(&task_id, slot, config)),
            ),
        };

        ReplayStep {
            index,
            task_id,
            event: name,
            result,
        }
    }

    fn with_controller<F>(&mut self, task_id: &str, f: F) -> Result<Outcome, NotifyError>
    where
        F: FnOnce(&mut LifecycleController, SlotId) -> Result<Outcome, NotifyError>,
    {
        let ctx = &self.ctx;
        let controller = self
            .controllers
            .entry(task_id.to_string())
            .or_insert_with(|| ctx.controller());
        // 未 start 的任务没有槽位，交给控制器报告协议违例
        let slot = controller.slot().unwrap_or(SlotId(0));
        f(controller, slot)
    }
}

/// 处理 replay 命令
pub fn handle_replay(args: ReplayArgs, settings: &NotifierSettings) -> Result<()> {
    let config = load_notification_config(&args.config)?;
    let events = read_script(&args.events)?;
    if events.is_empty() {
        return Err(anyhow!("事件脚本为空: {}", args.events.display()));
    }

    let notifier: Arc<dyn PlatformNotifier> = if args.journal {
        let path = settings.journal_path();
        info!(path = %path.display(), "Replaying into notification journal");
        Arc::new(LocalFileNotifier::new(path))
    } else {
        Arc::new(ConsoleNotifier::stdout())
    };

    let mut replayer = Replayer::new(
        notifier,
        settings,
        &config.channel_id,
        args.claim_from,
        args.dry_run,
    );

    let mut violations = 0;
    for (index, event) in events.iter().enumerate() {
        let step = replayer.step(index, event, &config);
        match &step.result {
            Ok(outcome) => println!("#{} {} {} -> {:?}", step.index, step.task_id, step.event, outcome),
            Err(e) => {
                if e.is_protocol_violation() {
                    violations += 1;
                }
                warn!(task_id = %step.task_id, event = step.event, error = %e, "Event rejected");
                println!("#{} {} {} -> error: {}", step.index, step.task_id, step.event, e);
            }
        }
    }

    let live = replayer.dispatcher().live_slots();
    println!(
        "\n重放 {} 个事件，协议违例 {} 个，仍在展示的槽位: {:?}",
        events.len(),
        violations,
        live
    );
    Ok(())
}

fn read_script(path: &Path) -> Result<Vec<ScriptEvent>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_script(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::config::{StatusConfig, StatusKind};
    use crate::notification::controller::LifecycleState;

    struct NullNotifier;

    impl PlatformNotifier for NullNotifier {
        fn name(&self) -> &str {
            "null"
        }

        fn show(&self, _slot: SlotId, _state: &PresentationState) -> Result<(), NotifyError> {
            Ok(())
        }

        fn cancel(&self, _slot: SlotId) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn config() -> NotificationConfig {
        let mut config = NotificationConfig::new("uploads");
        for kind in StatusKind::ALL {
            config = config.with_status(kind, StatusConfig::new(kind.as_str(), ""));
        }
        config
    }

    fn settings() -> NotifierSettings {
        NotifierSettings {
            ownership_timeout_ms: 0,
            ..NotifierSettings::default()
        }
    }

    const SCRIPT: &str = r#"
# cancelled upload
{"event":"start","task_id":"u1","slot":3,"metadata":{"FILE_NAME":"a.jpg"}}
{"event":"progress","task_id":"u1","uploaded_bytes":5,"total_bytes":10}
{"event":"error","task_id":"u1","cause":{"type":"user_cancelled"}}
{"event":"completed","task_id":"u1"}
"#;

    #[test]
    fn test_parse_script() {
        let events = parse_script(SCRIPT).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[2],
            ScriptEvent::Error {
                task_id: "u1".to_string(),
                cause: FailureCause::UserCancelled
            }
        );
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("{\"event\":\"start\"}").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_replay_cancelled_upload() {
        let config = config();
        let mut replayer = Replayer::new(Arc::new(NullNotifier), &settings(), "uploads", None, false);

        let outcomes: Vec<_> = parse_script(SCRIPT)
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, e)| replayer.step(i, e, &config).result.unwrap())
            .collect();

        assert_eq!(
            outcomes,
            vec![
                Outcome::Displayed(StatusKind::Ongoing),
                Outcome::Unchanged,
                Outcome::Displayed(StatusKind::Cancelled),
                Outcome::Displayed(StatusKind::Completed),
            ]
        );
        assert_eq!(replayer.controllers["u1"].state(), LifecycleState::Completed);
        assert_eq!(replayer.dispatcher().live_slots(), vec![SlotId(3)]);
    }

    #[test]
    fn test_replay_with_claim() {
        let config = config();
        let mut replayer =
            Replayer::new(Arc::new(NullNotifier), &settings(), "uploads", Some(1), false);
        let events = parse_script(SCRIPT).unwrap();

        let first = replayer.step(0, &events[0], &config).result.unwrap();
        assert_eq!(first, Outcome::Displayed(StatusKind::Ongoing));

        let third = replayer.step(2, &events[2], &config).result.unwrap();
        assert_eq!(third, Outcome::Suppressed(StatusKind::Cancelled));
        assert!(replayer.dispatcher().live_slots().is_empty());
    }

    #[test]
    fn test_replay_unknown_task_is_violation() {
        let config = config();
        let mut replayer = Replayer::new(Arc::new(NullNotifier), &settings(), "uploads", None, false);
        let event = ScriptEvent::Completed {
            task_id: "ghost".to_string(),
        };

        let step = replayer.step(0, &event, &config);
        assert!(step.result.unwrap_err().is_protocol_violation());
    }
}
