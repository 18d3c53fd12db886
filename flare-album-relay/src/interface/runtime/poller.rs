//! 更新拉取运行时
//!
//! 长轮询网关更新：媒体消息进入缓冲，审核接收者的管理命令直接回复。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::application::AlbumCommandHandler;
use crate::application::commands::AdmitMediaCommand;
use crate::domain::model::{ChatId, InboundEvent, InboundUpdate, SenderProfile};
use crate::domain::repository::{MediaGateway, UpdateSource};
use crate::interface::admin::{AdminCommand, AdminConsole};

/// 拉取失败后的退避时间
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(3);

pub struct UpdatePoller {
    source: Arc<dyn UpdateSource>,
    gateway: Arc<dyn MediaGateway>,
    commands: Arc<AlbumCommandHandler>,
    admin: AdminConsole,
    oversight_chat_id: Option<ChatId>,
}

impl UpdatePoller {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        gateway: Arc<dyn MediaGateway>,
        commands: Arc<AlbumCommandHandler>,
        admin: AdminConsole,
        oversight_chat_id: Option<ChatId>,
    ) -> Self {
        Self {
            source,
            gateway,
            commands,
            admin,
            oversight_chat_id,
        }
    }

    /// 持续拉取直到 `shutdown` 变为 true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting update poller");
        let mut offset: Option<i64> = None;

        loop {
            let fetched = tokio::select! {
                result = self.source.fetch_updates(offset) => result,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            match fetched {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(error = %e, "Failed to fetch updates, backing off");
                    } else {
                        error!(error = %e, "Update source returned an unexpected error");
                    }
                    if Self::back_off(&mut shutdown).await {
                        break;
                    }
                }
            }
        }

        info!("Update poller stopped");
    }

    /// 拉取失败后等待；等待期间收到停机信号时返回 true
    async fn back_off(shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => false,
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
        }
    }

    /// 处理一次更新
    pub async fn handle_update(&self, update: InboundUpdate) {
        match update.event {
            InboundEvent::Media(item) => {
                self.commands.handle_admit_media(AdmitMediaCommand { item });
            }
            InboundEvent::Text {
                sender,
                chat_id,
                text,
            } => {
                self.handle_text(&sender, chat_id, &text).await;
            }
            InboundEvent::Ignored => {
                debug!(update_id = update.update_id, "update ignored");
            }
        }
    }

    async fn handle_text(&self, sender: &SenderProfile, chat_id: ChatId, text: &str) {
        if self.oversight_chat_id != Some(sender.id) {
            return;
        }
        let Some(command) = AdminCommand::parse(text) else {
            return;
        };

        let reply = self.admin.respond(command).await;
        if let Err(e) = self.gateway.send_notice(chat_id, &reply).await {
            warn!(sender_id = sender.id, ?command, error = %e, "Failed to answer admin command");
        }
    }
}
