//! 领域层（业务核心逻辑）

pub mod model;
pub mod repository;
pub mod service;

pub use model::{
    ActivityRecord, BufferStats, ChatId, DispatchReport, InboundEvent, InboundUpdate, MediaItem,
    MediaKind, MessageId, SenderBuffer, SenderId, SenderProfile,
};
pub use repository::{ActivityTrail, MediaGateway, UpdateSource};
pub use service::{Admission, BatchDispatcher, BufferManager, DebounceTimer, IdleReclaimer};
