//! 仓储接口（Port）

use async_trait::async_trait;

use crate::domain::model::{ActivityRecord, ChatId, InboundUpdate, MediaItem, MessageId};
use crate::error::AlbumResult;

/// 消息网关（投递、转发、通知）
#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// 以一条相册消息投递一组媒体
    async fn deliver_group(&self, destination: ChatId, items: &[MediaItem]) -> AlbumResult<()>;

    /// 原样转发单条消息
    async fn forward_item(
        &self,
        recipient: ChatId,
        source_chat: ChatId,
        message_id: MessageId,
    ) -> AlbumResult<()>;

    /// 发送纯文本通知
    async fn send_notice(&self, recipient: ChatId, text: &str) -> AlbumResult<()>;
}

/// 活动日志（只追加，按行原子写入）
#[async_trait]
pub trait ActivityTrail: Send + Sync {
    async fn record(&self, entry: &ActivityRecord) -> AlbumResult<()>;

    /// 最近的 `limit` 行，旧的在前
    async fn recent(&self, limit: usize) -> AlbumResult<Vec<String>>;
}

/// 入站更新来源
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// 拉取 `offset` 之后的更新，`offset` 之前的视为已确认
    async fn fetch_updates(&self, offset: Option<i64>) -> AlbumResult<Vec<InboundUpdate>>;
}
