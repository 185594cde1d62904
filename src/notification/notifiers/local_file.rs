//! 本地文件通知 - 将所有展示和撤回写入 JSONL 日志

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::notification::error::NotifyError;
use crate::notification::platform::PlatformNotifier;
use crate::notification::presentation::PresentationState;
use crate::notification::store::{JournalRecord, NotificationJournal};
use crate::task::SlotId;

/// 本地文件通知
pub struct LocalFileNotifier {
    journal: NotificationJournal,
}

impl LocalFileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            journal: NotificationJournal::new(path),
        }
    }

    pub fn journal(&self) -> &NotificationJournal {
        &self.journal
    }

    fn record(&self, record: JournalRecord) -> Result<(), NotifyError> {
        match self.journal.append(&record) {
            Ok(()) => {
                debug!(
                    notifier = "local_file",
                    slot = %record.slot,
                    action = ?record.action,
                    "Notification recorded to local file"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    notifier = "local_file",
                    error = %e,
                    "Failed to write notification to local file"
                );
                Err(NotifyError::platform(e.to_string()))
            }
        }
    }
}

impl Default for LocalFileNotifier {
    fn default() -> Self {
        Self::new(NotificationJournal::default_path())
    }
}

impl PlatformNotifier for LocalFileNotifier {
    fn name(&self) -> &str {
        "local_file"
    }

    fn show(&self, slot: SlotId, state: &PresentationState) -> Result<(), NotifyError> {
        self.record(JournalRecord::show(slot, state))
    }

    fn cancel(&self, slot: SlotId) -> Result<(), NotifyError> {
        self.record(JournalRecord::cancel(slot))
    }
}
