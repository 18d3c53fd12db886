//! 命令结构体定义（Command DTO）

use crate::domain::model::{MediaItem, SenderId};

/// 接收媒体条目命令
#[derive(Debug, Clone)]
pub struct AdmitMediaCommand {
    /// 入站媒体条目
    pub item: MediaItem,
}

/// 分发发送者缓冲命令（定时器到期时触发）
#[derive(Debug, Clone, Copy)]
pub struct DispatchSenderCommand {
    /// 发送者 ID
    pub sender_id: SenderId,
}

/// 回收闲置缓冲命令
#[derive(Debug, Clone, Copy, Default)]
pub struct ReclaimIdleBuffersCommand;
