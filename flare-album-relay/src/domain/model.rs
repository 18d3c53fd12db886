//! 领域模型：媒体条目、发送者缓冲、活动记录

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use flare_album_core::utils::format_activity_time;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub type SenderId = i64;
pub type ChatId = i64;
pub type MessageId = i64;

/// 媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// 发送者资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub id: SenderId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl SenderProfile {
    /// 活动日志中使用的展示名，无用户名时为 `unknown`
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }

    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// 一条入站媒体消息，捕获后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub sender: SenderProfile,
    /// 来源会话
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub kind: MediaKind,
    /// 可用于重新发送的内容引用
    pub file_id: String,
    pub received_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn sender_id(&self) -> SenderId {
        self.sender.id
    }

    pub fn is_photo(&self) -> bool {
        self.kind == MediaKind::Photo
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// 单个发送者的待分发缓冲
///
/// 条目按到达顺序追加，同一消息 ID 只保留一份。
#[derive(Debug)]
pub struct SenderBuffer {
    items: Vec<MediaItem>,
    timer_armed: bool,
    last_arrival: Instant,
}

impl SenderBuffer {
    pub fn new(now: Instant) -> Self {
        Self {
            items: Vec::new(),
            timer_armed: false,
            last_arrival: now,
        }
    }

    /// 追加条目，消息 ID 已存在时返回 false
    pub fn push(&mut self, item: MediaItem, now: Instant) -> bool {
        if self.contains(item.message_id) {
            return false;
        }
        self.items.push(item);
        self.last_arrival = now;
        true
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.items.iter().any(|item| item.message_id == message_id)
    }

    pub fn mark_timer_armed(&mut self) {
        self.timer_armed = true;
    }

    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    pub fn last_arrival(&self) -> Instant {
        self.last_arrival
    }

    /// 非空且最后一次追加早于过期窗口
    pub fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        !self.items.is_empty() && now.saturating_duration_since(self.last_arrival) > stale_after
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<MediaItem> {
        self.items
    }
}

/// 一次相册投递的活动记录，只追加
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub sender_id: SenderId,
    pub display_name: String,
    pub total: usize,
    pub photos: usize,
    pub videos: usize,
    pub recorded_at: DateTime<Local>,
}

impl ActivityRecord {
    /// 汇总一个相册，发送者取首条目；空相册返回 None
    pub fn summarize(group: &[MediaItem], recorded_at: DateTime<Local>) -> Option<Self> {
        let first = group.first()?;
        let photos = group.iter().filter(|item| item.is_photo()).count();
        let videos = group.iter().filter(|item| item.is_video()).count();

        Some(Self {
            sender_id: first.sender_id(),
            display_name: first.sender.display_name().to_string(),
            total: group.len(),
            photos,
            videos,
            recorded_at,
        })
    }
}

impl fmt::Display for ActivityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] User {} (@{}): processed {} files ({} photos, {} videos)",
            format_activity_time(&self.recorded_at),
            self.sender_id,
            self.display_name,
            self.total,
            self.photos,
            self.videos
        )
    }
}

/// 缓冲快照，供管理查询使用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub active_senders: usize,
    pub buffered_items: usize,
}

/// 单次分发结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sender_id: SenderId,
    pub drained: usize,
    pub mirrored: usize,
    pub groups_delivered: usize,
    pub groups_failed: usize,
    pub items_delivered: usize,
}

/// 入站事件
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// 照片或视频
    Media(MediaItem),
    /// 文本消息（可能是管理命令）
    Text {
        sender: SenderProfile,
        chat_id: ChatId,
        text: String,
    },
    /// 其他不处理的消息
    Ignored,
}

/// 网关推送的一次更新
#[derive(Debug, Clone, PartialEq)]
pub struct InboundUpdate {
    pub update_id: i64,
    pub event: InboundEvent,
}
