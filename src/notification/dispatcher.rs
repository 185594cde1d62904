//! 通知分发器 - 管理每个槽位当前展示的通知
//!
//! 同一槽位的 emit/withdraw 互斥执行，不同槽位之间没有顺序要求。
//! 槽位上是否有通知只由分发器记录。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::error::NotifyError;
use super::platform::PlatformNotifier;
use super::presentation::PresentationState;
use crate::task::SlotId;

type SlotCell = Arc<Mutex<Option<PresentationState>>>;

/// 通知分发器
pub struct NotificationDispatcher {
    /// 平台通知原语
    notifier: Arc<dyn PlatformNotifier>,
    /// 槽位 -> 当前展示的状态
    slots: Mutex<HashMap<SlotId, SlotCell>>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    pub fn new(notifier: Arc<dyn PlatformNotifier>) -> Self {
        info!(notifier = notifier.name(), "Creating notification dispatcher");
        Self {
            notifier,
            slots: Mutex::new(HashMap::new()),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 展示通知，替换槽位上已有的通知
    pub fn emit(&self, slot: SlotId, state: PresentationState) -> Result<(), NotifyError> {
        let cell = self.cell(slot);
        let mut live = lock(&cell);

        if self.dry_run {
            eprintln!("[DRY-RUN] Would show slot {}: {}", slot, state.title);
        } else if let Err(e) = self.notifier.show(slot, &state) {
            warn!(slot = %slot, notifier = self.notifier.name(), error = %e, "Notification show failed");
            if live.is_none() {
                drop(live);
                self.release(slot, &cell);
            }
            return Err(e);
        }

        debug!(
            slot = %slot,
            kind = %state.kind,
            sticky = state.sticky,
            replaced = live.is_some(),
            "Notification emitted"
        );
        *live = Some(state);
        Ok(())
    }

    /// 撤回槽位上的通知
    ///
    /// 槽位为空时不做任何事，返回 `Ok(false)`。
    pub fn withdraw(&self, slot: SlotId) -> Result<bool, NotifyError> {
        let cell = self.cell(slot);
        let mut live = lock(&cell);

        if live.is_none() {
            debug!(slot = %slot, "Nothing to withdraw");
            drop(live);
            self.release(slot, &cell);
            return Ok(false);
        }

        if self.dry_run {
            eprintln!("[DRY-RUN] Would cancel slot {}", slot);
        } else if let Err(e) = self.notifier.cancel(slot) {
            warn!(slot = %slot, notifier = self.notifier.name(), error = %e, "Notification cancel failed");
            return Err(e);
        }

        debug!(slot = %slot, "Notification withdrawn");
        *live = None;
        drop(live);
        self.release(slot, &cell);
        Ok(true)
    }

    /// 槽位上是否有通知
    pub fn is_live(&self, slot: SlotId) -> bool {
        self.live_state(slot).is_some()
    }

    /// 槽位上当前展示的状态
    pub fn live_state(&self, slot: SlotId) -> Option<PresentationState> {
        let cell = lock(&self.slots).get(&slot).cloned()?;
        let state = lock(&cell).clone();
        state
    }

    /// 所有有通知的槽位（升序）
    pub fn live_slots(&self) -> Vec<SlotId> {
        let cells: Vec<(SlotId, SlotCell)> = lock(&self.slots)
            .iter()
            .map(|(slot, cell)| (*slot, Arc::clone(cell)))
            .collect();

        let mut slots: Vec<SlotId> = cells
            .into_iter()
            .filter(|(_, cell)| lock(cell).is_some())
            .map(|(slot, _)| slot)
            .collect();
        slots.sort();
        slots
    }

    /// 获取平台通知名称
    pub fn notifier_name(&self) -> &str {
        self.notifier.name()
    }

    fn cell(&self, slot: SlotId) -> SlotCell {
        let mut slots = lock(&self.slots);
        let cell = Arc::clone(slots.entry(slot).or_default());
        cell
    }

    /// 移除空槽位的记录（没有其他调用方持有时）
    fn release(&self, slot: SlotId, cell: &SlotCell) {
        let mut slots = lock(&self.slots);
        // 映射表和当前调用各持有一份
        if Arc::strong_count(cell) == 2 && lock(cell).is_none() {
            slots.remove(&slot);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::config::{StatusConfig, StatusKind};
    use crate::notification::presentation::PresentationBuilder;
    use crate::task::TaskInfo;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// 测试用的 mock 平台
    #[derive(Default)]
    struct MockPlatform {
        show_count: AtomicUsize,
        cancel_count: AtomicUsize,
        unavailable: AtomicBool,
        /// 同时处于 show 中的调用数
        in_flight: AtomicUsize,
        overlapped: AtomicBool,
    }

    impl PlatformNotifier for MockPlatform {
        fn name(&self) -> &str {
            "mock"
        }

        fn show(&self, _slot: SlotId, _state: &PresentationState) -> Result<(), NotifyError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(NotifyError::platform("offline"));
            }
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(2));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.show_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn cancel(&self, _slot: SlotId) -> Result<(), NotifyError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(NotifyError::platform("offline"));
            }
            self.cancel_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn state(title: &str) -> PresentationState {
        PresentationBuilder::default().build(
            StatusKind::Ongoing,
            &StatusConfig::new(title, ""),
            &TaskInfo::new("upload-1"),
            "group",
            true,
        )
    }

    #[test]
    fn test_emit_replaces_previous() {
        let platform = Arc::new(MockPlatform::default());
        let dispatcher = NotificationDispatcher::new(platform.clone());

        dispatcher.emit(SlotId(1), state("first")).unwrap();
        dispatcher.emit(SlotId(1), state("second")).unwrap();

        assert_eq!(platform.show_count.load(Ordering::SeqCst), 2);
        assert_eq!(platform.cancel_count.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.live_state(SlotId(1)).unwrap().title, "second");
        assert_eq!(dispatcher.live_slots(), vec![SlotId(1)]);
    }

    #[test]
    fn test_withdraw_is_idempotent() {
        let platform = Arc::new(MockPlatform::default());
        let dispatcher = NotificationDispatcher::new(platform.clone());

        dispatcher.emit(SlotId(1), state("shown")).unwrap();
        assert!(dispatcher.withdraw(SlotId(1)).unwrap());
        assert!(!dispatcher.withdraw(SlotId(1)).unwrap());

        assert_eq!(platform.cancel_count.load(Ordering::SeqCst), 1);
        assert!(!dispatcher.is_live(SlotId(1)));
    }

    #[test]
    fn test_withdraw_empty_slot_is_noop() {
        let platform = Arc::new(MockPlatform::default());
        let dispatcher = NotificationDispatcher::new(platform.clone());

        assert!(!dispatcher.withdraw(SlotId(9)).unwrap());
        assert_eq!(platform.cancel_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_withdraw_releases_slot_entry() {
        let platform = Arc::new(MockPlatform::default());
        let dispatcher = NotificationDispatcher::new(platform.clone());

        for i in 0..100 {
            dispatcher.emit(SlotId(i), state("shown")).unwrap();
            assert!(dispatcher.withdraw(SlotId(i)).unwrap());
        }
        assert!(!dispatcher.withdraw(SlotId(500)).unwrap());

        platform.unavailable.store(true, Ordering::SeqCst);
        assert!(dispatcher.emit(SlotId(600), state("lost")).is_err());

        assert!(dispatcher.slots.lock().unwrap().is_empty());
        assert!(dispatcher.live_slots().is_empty());
    }

    #[test]
    fn test_platform_failure_keeps_previous_state() {
        let platform = Arc::new(MockPlatform::default());
        let dispatcher = NotificationDispatcher::new(platform.clone());

        dispatcher.emit(SlotId(1), state("first")).unwrap();
        platform.unavailable.store(true, Ordering::SeqCst);

        let err = dispatcher.emit(SlotId(1), state("second")).unwrap_err();
        assert!(matches!(err, NotifyError::PlatformUnavailable(_)));
        assert_eq!(dispatcher.live_state(SlotId(1)).unwrap().title, "first");

        assert!(dispatcher.withdraw(SlotId(1)).is_err());
        assert!(dispatcher.is_live(SlotId(1)));
    }

    #[test]
    fn test_dry_run_does_not_call_platform() {
        let platform = Arc::new(MockPlatform::default());
        let dispatcher = NotificationDispatcher::new(platform.clone()).with_dry_run(true);

        dispatcher.emit(SlotId(1), state("shown")).unwrap();
        assert!(dispatcher.is_live(SlotId(1)));
        assert!(dispatcher.withdraw(SlotId(1)).unwrap());

        assert_eq!(platform.show_count.load(Ordering::SeqCst), 0);
        assert_eq!(platform.cancel_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_same_slot_calls_are_serialized() {
        let platform = Arc::new(MockPlatform::default());
        let dispatcher = Arc::new(NotificationDispatcher::new(platform.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    dispatcher.emit(SlotId(7), state(&format!("t{}", i))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(platform.show_count.load(Ordering::SeqCst), 8);
        assert!(!platform.overlapped.load(Ordering::SeqCst));
        assert_eq!(dispatcher.live_slots(), vec![SlotId(7)]);
    }
}
