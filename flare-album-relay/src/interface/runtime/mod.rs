pub mod dispatch;
pub mod poller;

pub use dispatch::{DispatchDrain, DispatchRuntime};
pub use poller::UpdatePoller;
