//! 领域服务

pub mod buffer_manager;
pub mod debounce;
pub mod dispatcher;
pub mod reclaimer;

pub use buffer_manager::{Admission, BufferManager, EvictedBuffer};
pub use debounce::DebounceTimer;
pub use dispatcher::{BatchDispatcher, DispatchSettings, oversight_summary, partition_groups};
pub use reclaimer::IdleReclaimer;
