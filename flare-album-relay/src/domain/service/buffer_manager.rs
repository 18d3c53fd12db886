//! 缓冲管理器 - 按发送者分片的待分发缓冲
//!
//! 缓冲表使用 DashMap，同一发送者的创建、追加、取出、回收都在对应分片锁内完成，
//! 不同发送者之间互不阻塞。

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flare_album_core::metrics::AlbumRelayMetrics;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::model::{BufferStats, MediaItem, SenderBuffer, SenderId};
use crate::domain::service::debounce::DebounceTimer;

/// 入队结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 新建缓冲并启动了定时器
    Opened,
    /// 追加到已有缓冲
    Appended,
    /// 消息 ID 重复，已忽略
    Duplicate,
}

/// 被回收的缓冲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictedBuffer {
    pub sender_id: SenderId,
    pub items: usize,
}

pub struct BufferManager {
    buffers: DashMap<SenderId, SenderBuffer>,
    timer: DebounceTimer,
    metrics: Arc<AlbumRelayMetrics>,
}

impl BufferManager {
    pub fn new(timer: DebounceTimer, metrics: Arc<AlbumRelayMetrics>) -> Self {
        Self {
            buffers: DashMap::new(),
            timer,
            metrics,
        }
    }

    /// 接收一个媒体条目
    ///
    /// 空闲发送者的首个条目会创建缓冲并启动定时器；后续条目只追加，不重置定时器。
    pub fn admit(&self, item: MediaItem) -> Admission {
        let now = Instant::now();
        let sender_id = item.sender_id();
        let message_id = item.message_id;

        let admission = match self.buffers.entry(sender_id) {
            Entry::Vacant(entry) => {
                let mut buffer = SenderBuffer::new(now);
                buffer.push(item, now);
                self.timer.arm(sender_id);
                buffer.mark_timer_armed();
                entry.insert(buffer);
                self.metrics.active_buffers.inc();
                Admission::Opened
            }
            Entry::Occupied(mut entry) => {
                if entry.get_mut().push(item, now) {
                    Admission::Appended
                } else {
                    Admission::Duplicate
                }
            }
        };

        match admission {
            Admission::Duplicate => {
                self.metrics.duplicates_rejected_total.inc();
                debug!(sender_id, message_id, "duplicate media item ignored");
            }
            _ => {
                self.metrics.items_admitted_total.inc();
                debug!(sender_id, message_id, ?admission, "media item buffered");
            }
        }

        admission
    }

    /// 原子地取出发送者的缓冲，不存在时返回 None
    pub fn drain(&self, sender_id: SenderId) -> Option<SenderBuffer> {
        let (_, buffer) = self.buffers.remove(&sender_id)?;
        self.metrics.active_buffers.dec();
        Some(buffer)
    }

    /// 回收最后一次追加早于 `stale_after` 的缓冲
    pub fn evict_stale(&self, now: Instant, stale_after: Duration) -> Vec<EvictedBuffer> {
        let mut evicted = Vec::new();

        self.buffers.retain(|sender_id, buffer| {
            if buffer.is_stale(now, stale_after) {
                evicted.push(EvictedBuffer {
                    sender_id: *sender_id,
                    items: buffer.len(),
                });
                false
            } else {
                true
            }
        });

        if !evicted.is_empty() {
            let count = evicted.len() as u64;
            self.metrics.active_buffers.sub(count as i64);
            self.metrics.buffers_reclaimed_total.inc_by(count);
        }

        evicted
    }

    /// 当前缓冲快照
    pub fn stats(&self) -> BufferStats {
        self.buffers
            .iter()
            .fold(BufferStats::default(), |mut stats, entry| {
                stats.active_senders += 1;
                stats.buffered_items += entry.value().len();
                stats
            })
    }

    /// 发送者当前缓冲的条目数
    pub fn buffered_len(&self, sender_id: SenderId) -> Option<usize> {
        self.buffers.get(&sender_id).map(|buffer| buffer.len())
    }
}
