//! CLI command handling

pub mod check;
pub mod history;
pub mod replay;

pub use check::*;
pub use history::*;
pub use replay::*;
