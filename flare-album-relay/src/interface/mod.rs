//! 接口层：管理命令与运行时循环

pub mod admin;
pub mod runtime;

pub use admin::{AdminCommand, AdminConsole};
pub use runtime::{DispatchDrain, DispatchRuntime, UpdatePoller};
