//! 集成测试公共组件：记录型网关、内存活动日志、脚本化更新源

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use flare_album_relay::AlbumRelayConfig;
use flare_album_relay::domain::model::{
    ActivityRecord, ChatId, InboundUpdate, MediaItem, MediaKind, MessageId, SenderId,
    SenderProfile,
};
use flare_album_relay::domain::repository::{ActivityTrail, MediaGateway, UpdateSource};
use flare_album_relay::error::{AlbumError, AlbumResult};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 不读取环境变量的测试配置
pub fn test_config(oversight_chat_id: Option<ChatId>) -> AlbumRelayConfig {
    AlbumRelayConfig {
        service_name: "album-relay-test".to_string(),
        gateway_base_url: "http://127.0.0.1:9".to_string(),
        gateway_token: Some("test-token".to_string()),
        oversight_chat_id,
        debounce_window_ms: 1500,
        max_group_size: 10,
        forward_pacing_ms: 100,
        stale_after_secs: 300,
        reclaim_interval_secs: 300,
        activity_log_path: "bot_activity.log".to_string(),
        activity_tail_lines: 20,
        poll_timeout_secs: 30,
        media_group_timeout_secs: 120,
        shutdown_grace_secs: 10,
    }
}

pub fn sender(id: SenderId, username: Option<&str>) -> SenderProfile {
    SenderProfile {
        id,
        username: username.map(str::to_string),
        first_name: "Test".to_string(),
        last_name: Some("User".to_string()),
    }
}

pub fn media(sender_id: SenderId, message_id: MessageId, kind: MediaKind) -> MediaItem {
    MediaItem {
        sender: sender(sender_id, Some("alice")),
        chat_id: sender_id,
        message_id,
        kind,
        file_id: format!("file-{sender_id}-{message_id}"),
        received_at: Utc::now(),
    }
}

pub fn photo(sender_id: SenderId, message_id: MessageId) -> MediaItem {
    media(sender_id, message_id, MediaKind::Photo)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Group {
        destination: ChatId,
        message_ids: Vec<MessageId>,
        kinds: Vec<MediaKind>,
    },
    Forward {
        recipient: ChatId,
        source_chat: ChatId,
        message_id: MessageId,
    },
    Notice {
        recipient: ChatId,
        text: String,
    },
}

/// 记录所有调用的网关，可按序号注入失败
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    group_attempts: AtomicUsize,
    forward_attempts: AtomicUsize,
    failing_groups: Mutex<HashSet<usize>>,
    failing_forwards: Mutex<HashSet<usize>>,
}

impl RecordingGateway {
    /// 第 `attempt` 次（从 0 开始）相册投递失败
    pub fn fail_group_attempt(&self, attempt: usize) {
        self.failing_groups.lock().unwrap().insert(attempt);
    }

    /// 第 `attempt` 次（从 0 开始）转发失败
    pub fn fail_forward_attempt(&self, attempt: usize) {
        self.failing_forwards.lock().unwrap().insert(attempt);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn groups(&self) -> Vec<(ChatId, Vec<MessageId>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Group {
                    destination,
                    message_ids,
                    ..
                } => Some((destination, message_ids)),
                _ => None,
            })
            .collect()
    }

    /// 每个已投递相册的（消息 ID，类型）序列
    pub fn group_contents(&self) -> Vec<Vec<(MessageId, MediaKind)>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Group {
                    message_ids, kinds, ..
                } => Some(message_ids.into_iter().zip(kinds).collect()),
                _ => None,
            })
            .collect()
    }

    pub fn notices_to(&self, recipient: ChatId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Notice { recipient: r, text } if r == recipient => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MediaGateway for RecordingGateway {
    async fn deliver_group(&self, destination: ChatId, items: &[MediaItem]) -> AlbumResult<()> {
        let attempt = self.group_attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_groups.lock().unwrap().contains(&attempt) {
            return Err(AlbumError::Delivery(format!("group {attempt} rejected")));
        }
        self.push(GatewayCall::Group {
            destination,
            message_ids: items.iter().map(|item| item.message_id).collect(),
            kinds: items.iter().map(|item| item.kind).collect(),
        });
        Ok(())
    }

    async fn forward_item(
        &self,
        recipient: ChatId,
        source_chat: ChatId,
        message_id: MessageId,
    ) -> AlbumResult<()> {
        let attempt = self.forward_attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_forwards.lock().unwrap().contains(&attempt) {
            return Err(AlbumError::Delivery(format!("forward {attempt} rejected")));
        }
        self.push(GatewayCall::Forward {
            recipient,
            source_chat,
            message_id,
        });
        Ok(())
    }

    async fn send_notice(&self, recipient: ChatId, text: &str) -> AlbumResult<()> {
        self.push(GatewayCall::Notice {
            recipient,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// 内存活动日志
#[derive(Default)]
pub struct MemoryTrail {
    lines: Mutex<Vec<String>>,
}

impl MemoryTrail {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityTrail for MemoryTrail {
    async fn record(&self, entry: &ActivityRecord) -> AlbumResult<()> {
        self.lines.lock().unwrap().push(entry.to_string());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AlbumResult<Vec<String>> {
        let lines = self.lines.lock().unwrap();
        let skip = lines.len().saturating_sub(limit);
        Ok(lines[skip..].to_vec())
    }
}

/// 每次拉取都失败的更新源
#[derive(Default)]
pub struct FailingSource {
    attempts: AtomicUsize,
}

impl FailingSource {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpdateSource for FailingSource {
    async fn fetch_updates(&self, _offset: Option<i64>) -> AlbumResult<Vec<InboundUpdate>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AlbumError::Delivery("connection reset".to_string()))
    }
}

/// 依次返回预设批次，耗尽后一直挂起
#[derive(Default)]
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Vec<InboundUpdate>>>,
    offsets: Mutex<Vec<Option<i64>>>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<InboundUpdate>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            offsets: Mutex::new(Vec::new()),
        }
    }

    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn fetch_updates(&self, offset: Option<i64>) -> AlbumResult<Vec<InboundUpdate>> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => std::future::pending().await,
        }
    }
}
