//! 终端通知 - 把展示和撤回打印到终端

use std::io::{self, Write};
use std::sync::Mutex;

use crate::notification::error::NotifyError;
use crate::notification::platform::PlatformNotifier;
use crate::notification::presentation::PresentationState;
use crate::task::SlotId;

/// 终端通知
pub struct ConsoleNotifier {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleNotifier {
    /// 输出到 stdout
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn write_line(&self, line: &str) -> Result<(), NotifyError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| NotifyError::platform("console writer poisoned"))?;
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(|e| NotifyError::platform(e.to_string()))
    }
}

impl PlatformNotifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    fn show(&self, slot: SlotId, state: &PresentationState) -> Result<(), NotifyError> {
        self.write_line(&format_show(slot, state))
    }

    fn cancel(&self, slot: SlotId) -> Result<(), NotifyError> {
        self.write_line(&format!("[slot {}] cancelled", slot))
    }
}

/// 格式化一条展示记录
pub fn format_show(slot: SlotId, state: &PresentationState) -> String {
    let mut line = format!("[slot {}] {}", slot, state.kind);
    if state.sticky {
        line.push_str(" (sticky)");
    }
    line.push_str(&format!(": {}", state.title));
    if !state.message.is_empty() {
        line.push_str(&format!(" | {}", state.message));
    }
    if let Some(progress) = state.progress {
        line.push_str(&format!(" [{}%]", progress.percent()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::config::{StatusConfig, StatusKind};
    use crate::notification::presentation::PresentationBuilder;
    use crate::task::{ProgressInfo, TaskInfo};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_format_show() {
        let builder = PresentationBuilder::default();
        let task = TaskInfo::new("upload-1");

        let ongoing = builder.build_progress(
            &StatusConfig::new("Uploading", "photo.jpg"),
            &task,
            "g",
            ProgressInfo::new(1, 4),
        );
        assert_eq!(
            format_show(SlotId(3), &ongoing),
            "[slot 3] ongoing (sticky): Uploading | photo.jpg [25%]"
        );

        let done = builder.build(StatusKind::Success, &StatusConfig::new("Done", ""), &task, "g", false);
        assert_eq!(format_show(SlotId(3), &done), "[slot 3] success: Done");
    }

    #[test]
    fn test_console_writes_lines() {
        let buffer = SharedBuffer::default();
        let notifier = ConsoleNotifier::with_writer(Box::new(buffer.clone()));

        notifier.cancel(SlotId(5)).unwrap();

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output, "[slot 5] cancelled\n");
    }
}
