//! 批量分发领域服务
//!
//! 定时器到期后：取出缓冲 → 镜像给审核接收者 → 按固定大小分组 → 逐组投递 → 记录活动。
//! 镜像与分组投递互不影响，任一组失败不影响后续组。

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flare_album_core::metrics::AlbumRelayMetrics;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::model::{ActivityRecord, ChatId, DispatchReport, MediaItem, SenderId};
use crate::domain::repository::{ActivityTrail, MediaGateway};
use crate::domain::service::buffer_manager::BufferManager;
use crate::error::AlbumResult;

/// 镜像完成后发送给审核接收者的确认文本
pub const MIRROR_COMPLETED_NOTICE: &str = "✅ All files forwarded. Processing complete.";

/// 分发参数
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// 审核接收者，None 时跳过镜像
    pub oversight_chat_id: Option<ChatId>,
    /// 单个相册最大条目数
    pub max_group_size: usize,
    /// 逐条转发之间的间隔
    pub forward_pacing: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            oversight_chat_id: None,
            max_group_size: 10,
            forward_pacing: Duration::from_millis(100),
        }
    }
}

pub struct BatchDispatcher {
    buffers: Arc<BufferManager>,
    gateway: Arc<dyn MediaGateway>,
    trail: Arc<dyn ActivityTrail>,
    settings: DispatchSettings,
    metrics: Arc<AlbumRelayMetrics>,
    /// 已取出缓冲但分发尚未结束的条目数（按发送者）
    in_flight: DashMap<SenderId, usize>,
}

impl BatchDispatcher {
    pub fn new(
        buffers: Arc<BufferManager>,
        gateway: Arc<dyn MediaGateway>,
        trail: Arc<dyn ActivityTrail>,
        settings: DispatchSettings,
        metrics: Arc<AlbumRelayMetrics>,
    ) -> Self {
        Self {
            buffers,
            gateway,
            trail,
            settings,
            metrics,
            in_flight: DashMap::new(),
        }
    }

    /// 已离开缓冲、分发尚未结束的条目总数
    pub fn in_flight_items(&self) -> usize {
        self.in_flight.iter().map(|entry| *entry.value()).sum()
    }

    /// 分发一个发送者的缓冲；缓冲不存在（已分发或已回收）时为空操作
    #[instrument(skip(self))]
    pub async fn dispatch(&self, sender_id: SenderId) -> DispatchReport {
        let mut report = DispatchReport {
            sender_id,
            ..Default::default()
        };

        let Some(buffer) = self.buffers.drain(sender_id) else {
            debug!(sender_id, "no pending buffer, dispatch skipped");
            return report;
        };

        let items = buffer.into_items();
        report.drained = items.len();
        if items.is_empty() {
            return report;
        }

        self.hold(sender_id, items.len());
        let timer = self.metrics.dispatch_duration_seconds.start_timer();

        report.mirrored = self.mirror(&items).await;

        for (group_index, group) in partition_groups(&items, self.settings.max_group_size)
            .into_iter()
            .enumerate()
        {
            let destination = group[0].chat_id;
            match self.gateway.deliver_group(destination, group).await {
                Ok(()) => {
                    report.groups_delivered += 1;
                    report.items_delivered += group.len();
                    self.metrics.groups_delivered_total.inc();
                    self.record_group(group).await;
                }
                Err(e) => {
                    report.groups_failed += 1;
                    self.metrics.group_delivery_failures_total.inc();
                    error!(
                        sender_id,
                        group_index,
                        items = group.len(),
                        error = %e,
                        "Failed to deliver media group"
                    );
                }
            }
        }

        timer.observe_duration();
        self.release(sender_id, items.len());

        info!(
            sender_id,
            drained = report.drained,
            mirrored = report.mirrored,
            groups_delivered = report.groups_delivered,
            groups_failed = report.groups_failed,
            "Sender batch dispatched"
        );

        report
    }

    /// 镜像整批条目给审核接收者，返回成功转发的条目数
    async fn mirror(&self, items: &[MediaItem]) -> usize {
        let Some(recipient) = self.settings.oversight_chat_id else {
            return 0;
        };

        let mut forwarded = 0;
        if let Err(e) = self.mirror_to(recipient, items, &mut forwarded).await {
            self.metrics.mirror_failures_total.inc();
            warn!(
                recipient,
                forwarded,
                total = items.len(),
                error = %e,
                "Failed to mirror batch to oversight recipient"
            );
        }
        forwarded
    }

    async fn mirror_to(
        &self,
        recipient: ChatId,
        items: &[MediaItem],
        forwarded: &mut usize,
    ) -> AlbumResult<()> {
        self.gateway
            .send_notice(recipient, &oversight_summary(items))
            .await?;

        for item in items {
            self.gateway
                .forward_item(recipient, item.chat_id, item.message_id)
                .await?;
            *forwarded += 1;
            tokio::time::sleep(self.settings.forward_pacing).await;
        }

        self.gateway
            .send_notice(recipient, MIRROR_COMPLETED_NOTICE)
            .await
    }

    fn hold(&self, sender_id: SenderId, items: usize) {
        *self.in_flight.entry(sender_id).or_insert(0) += items;
    }

    fn release(&self, sender_id: SenderId, items: usize) {
        if let Entry::Occupied(mut entry) = self.in_flight.entry(sender_id) {
            let left = entry.get().saturating_sub(items);
            if left == 0 {
                entry.remove();
            } else {
                *entry.get_mut() = left;
            }
        }
    }

    async fn record_group(&self, group: &[MediaItem]) {
        let Some(record) = ActivityRecord::summarize(group, Local::now()) else {
            return;
        };
        if let Err(e) = self.trail.record(&record).await {
            warn!(
                sender_id = record.sender_id,
                error = %e,
                "Failed to record activity"
            );
        }
    }
}

/// 按到达顺序切分为至多 `max_group_size` 条的连续分组
pub fn partition_groups(items: &[MediaItem], max_group_size: usize) -> Vec<&[MediaItem]> {
    items.chunks(max_group_size.max(1)).collect()
}

/// 审核接收者收到的批次摘要
pub fn oversight_summary(items: &[MediaItem]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let sender = &first.sender;
    let username = sender.username.as_deref().unwrap_or("not set");

    format!(
        "📩 New files from user:\n• ID: {}\n• Username: @{}\n• Name: {}\n• Total files: {}",
        sender.id,
        username,
        sender.full_name(),
        items.len()
    )
}
