//! 命令处理器（编排层）- 轻量级，只负责编排领域服务

use std::sync::Arc;

use tracing::instrument;

use crate::application::commands::{
    AdmitMediaCommand, DispatchSenderCommand, ReclaimIdleBuffersCommand,
};
use crate::domain::model::DispatchReport;
use crate::domain::service::{Admission, BatchDispatcher, BufferManager, IdleReclaimer};

/// 相册命令处理器（编排层）
pub struct AlbumCommandHandler {
    buffers: Arc<BufferManager>,
    dispatcher: Arc<BatchDispatcher>,
    reclaimer: Arc<IdleReclaimer>,
}

impl AlbumCommandHandler {
    pub fn new(
        buffers: Arc<BufferManager>,
        dispatcher: Arc<BatchDispatcher>,
        reclaimer: Arc<IdleReclaimer>,
    ) -> Self {
        Self {
            buffers,
            dispatcher,
            reclaimer,
        }
    }

    /// 处理接收媒体条目命令
    #[instrument(skip(self, command), fields(sender_id = command.item.sender_id(), message_id = command.item.message_id))]
    pub fn handle_admit_media(&self, command: AdmitMediaCommand) -> Admission {
        self.buffers.admit(command.item)
    }

    /// 处理分发命令
    #[instrument(skip(self), fields(sender_id = command.sender_id))]
    pub async fn handle_dispatch_sender(&self, command: DispatchSenderCommand) -> DispatchReport {
        self.dispatcher.dispatch(command.sender_id).await
    }

    /// 已取出但尚未分发完成的条目数
    pub fn in_flight_items(&self) -> usize {
        self.dispatcher.in_flight_items()
    }

    /// 处理回收命令
    #[instrument(skip(self, _command))]
    pub fn handle_reclaim_idle(&self, _command: ReclaimIdleBuffersCommand) -> usize {
        self.reclaimer.sweep()
    }
}
