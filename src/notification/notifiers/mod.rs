//! 具体平台通知实现

pub mod console;
pub mod local_file;

pub use console::ConsoleNotifier;
pub use local_file::LocalFileNotifier;
