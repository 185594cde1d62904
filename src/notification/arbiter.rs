//! 所有权仲裁 - 决定由控制器还是前台执行方展示任务槽位
//!
//! 每次发送前都会询问执行方，结果不缓存：前台会话可能在上传途中结束。
//! 执行方超时或 panic 时一律判定为控制器所有，保证用户总能看到反馈。
//! 超时后仍未返回的询问线程最多保留 `MAX_STALLED_CHECKS` 个，达到上限时不再新建线程。

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::presentation::PresentationState;

/// 默认仲裁超时
pub const DEFAULT_OWNERSHIP_TIMEOUT: Duration = Duration::from_millis(500);

/// 超时后仍阻塞的询问线程上限
pub const MAX_STALLED_CHECKS: usize = 1;

/// 前台执行方 trait
pub trait ExecutionOwner: Send + Sync {
    /// 是否接管该任务槽位的展示
    fn wants_ownership(&self, task_id: &str, candidate: &PresentationState) -> bool;
}

impl<F> ExecutionOwner for F
where
    F: Fn(&str, &PresentationState) -> bool + Send + Sync,
{
    fn wants_ownership(&self, task_id: &str, candidate: &PresentationState) -> bool {
        self(task_id, candidate)
    }
}

/// 从不接管的执行方
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverOwns;

impl ExecutionOwner for NeverOwns {
    fn wants_ownership(&self, _task_id: &str, _candidate: &PresentationState) -> bool {
        false
    }
}

/// 仲裁结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// 控制器自己展示
    Controller,
    /// 执行方接管，控制器撤回槽位
    External,
}

/// 所有权仲裁器
#[derive(Clone)]
pub struct OwnershipArbiter {
    owner: Arc<dyn ExecutionOwner>,
    /// 超时为 0 表示在当前线程直接调用，不设超时
    timeout: Duration,
    /// 调用方已放弃等待、但仍在运行的询问线程数（克隆之间共享）
    stalled: Arc<AtomicUsize>,
}

/// 询问线程退出时归还计数
struct CheckGuard {
    abandoned: Arc<AtomicBool>,
    stalled: Arc<AtomicUsize>,
}

impl Drop for CheckGuard {
    fn drop(&mut self) {
        if self.abandoned.swap(true, Ordering::SeqCst) {
            self.stalled.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl OwnershipArbiter {
    pub fn new(owner: Arc<dyn ExecutionOwner>) -> Self {
        Self {
            owner,
            timeout: DEFAULT_OWNERSHIP_TIMEOUT,
            stalled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 设置仲裁超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 超时后仍未返回的询问线程数
    pub fn stalled_checks(&self) -> usize {
        self.stalled.load(Ordering::SeqCst)
    }

    /// 决定本次展示的所有者
    pub fn decide_owner(&self, task_id: &str, candidate: &PresentationState) -> Ownership {
        let wants = if self.timeout.is_zero() {
            self.ask_inline(task_id, candidate)
        } else {
            self.ask_with_timeout(task_id, candidate)
        };

        let ownership = if wants {
            Ownership::External
        } else {
            Ownership::Controller
        };
        debug!(task_id = %task_id, ownership = ?ownership, "Ownership decided");
        ownership
    }

    fn ask_inline(&self, task_id: &str, candidate: &PresentationState) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| {
            self.owner.wants_ownership(task_id, candidate)
        })) {
            Ok(wants) => wants,
            Err(_) => {
                warn!(task_id = %task_id, "Execution owner panicked, controller keeps ownership");
                false
            }
        }
    }

    fn ask_with_timeout(&self, task_id: &str, candidate: &PresentationState) -> bool {
        let stalled = self.stalled_checks();
        if stalled >= MAX_STALLED_CHECKS {
            warn!(task_id = %task_id, stalled, "Execution owner still stalled, controller keeps ownership");
            return false;
        }

        let owner = Arc::clone(&self.owner);
        let id = task_id.to_string();
        let state = candidate.clone();
        let (tx, rx) = mpsc::sync_channel(1);
        let abandoned = Arc::new(AtomicBool::new(false));
        let guard = CheckGuard {
            abandoned: Arc::clone(&abandoned),
            stalled: Arc::clone(&self.stalled),
        };

        let spawned = thread::Builder::new()
            .name("ownership-check".to_string())
            .spawn(move || {
                let _guard = guard;
                let wants = owner.wants_ownership(&id, &state);
                let _ = tx.send(wants);
            });

        if let Err(e) = spawned {
            warn!(task_id = %task_id, error = %e, "Failed to spawn ownership check, controller keeps ownership");
            return false;
        }

        match rx.recv_timeout(self.timeout) {
            Ok(wants) => wants,
            Err(RecvTimeoutError::Timeout) => {
                // 先计数再标记，线程已退出时撤销
                self.stalled.fetch_add(1, Ordering::SeqCst);
                if abandoned.swap(true, Ordering::SeqCst) {
                    self.stalled.fetch_sub(1, Ordering::SeqCst);
                }
                warn!(
                    task_id = %task_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Execution owner timed out, controller keeps ownership"
                );
                false
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(task_id = %task_id, "Execution owner panicked, controller keeps ownership");
                false
            }
        }
    }
}
