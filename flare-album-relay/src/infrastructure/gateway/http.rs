//! 基于 HTTP 的消息网关客户端（Bot API 风格）
//!
//! 请求地址为 `{base_url}/bot{token}/{method}`，响应统一为 `{ ok, result, description }`。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::{
    ChatId, InboundEvent, InboundUpdate, MediaItem, MediaKind, MessageId, SenderProfile,
};
use crate::domain::repository::{MediaGateway, UpdateSource};
use crate::error::{AlbumError, AlbumResult};

/// 网关客户端配置
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub token: String,
    /// 长轮询超时
    pub poll_timeout: Duration,
    /// 相册投递请求超时
    pub media_group_timeout: Duration,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    config: HttpGatewayConfig,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> AlbumResult<Self> {
        if config.token.is_empty() {
            return Err(AlbumError::Configuration(
                "gateway token must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AlbumError::Configuration(format!("failed to build http client: {e}")))?;

        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    async fn call<P, R>(&self, method: &str, payload: &P, timeout: Duration) -> AlbumResult<R>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(payload)
            .send()
            .await?;

        let body: ApiResponse<R> = response.json().await?;
        if !body.ok {
            return Err(AlbumError::Gateway(format!(
                "{method} rejected: {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        body.result
            .ok_or_else(|| AlbumError::Gateway(format!("{method} returned no result")))
    }

    /// 核对令牌并返回机器人用户名
    pub async fn get_me(&self) -> AlbumResult<Option<String>> {
        let me: ApiUser = self
            .call("getMe", &serde_json::json!({}), Duration::from_secs(10))
            .await?;
        Ok(me.username)
    }
}

#[async_trait]
impl MediaGateway for HttpGateway {
    async fn deliver_group(&self, destination: ChatId, items: &[MediaItem]) -> AlbumResult<()> {
        let request = SendMediaGroupRequest {
            chat_id: destination,
            media: items.iter().map(InputMedia::from).collect(),
        };
        let _: serde_json::Value = self
            .call("sendMediaGroup", &request, self.config.media_group_timeout)
            .await?;
        Ok(())
    }

    async fn forward_item(
        &self,
        recipient: ChatId,
        source_chat: ChatId,
        message_id: MessageId,
    ) -> AlbumResult<()> {
        let request = ForwardMessageRequest {
            chat_id: recipient,
            from_chat_id: source_chat,
            message_id,
        };
        let _: serde_json::Value = self
            .call("forwardMessage", &request, Duration::from_secs(30))
            .await?;
        Ok(())
    }

    async fn send_notice(&self, recipient: ChatId, text: &str) -> AlbumResult<()> {
        let request = SendMessageRequest {
            chat_id: recipient,
            text,
        };
        let _: serde_json::Value = self
            .call("sendMessage", &request, Duration::from_secs(30))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for HttpGateway {
    async fn fetch_updates(&self, offset: Option<i64>) -> AlbumResult<Vec<InboundUpdate>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.config.poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };
        // 请求超时需长于服务端长轮询时间
        let timeout = self.config.poll_timeout + Duration::from_secs(10);
        let updates: Vec<ApiUpdate> = self.call("getUpdates", &request, timeout).await?;

        debug!(count = updates.len(), "fetched gateway updates");
        Ok(updates.into_iter().map(ApiUpdate::into_inbound).collect())
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct SendMediaGroupRequest {
    chat_id: ChatId,
    media: Vec<InputMedia>,
}

#[derive(Debug, Serialize, PartialEq)]
struct InputMedia {
    #[serde(rename = "type")]
    kind: MediaKind,
    media: String,
}

impl From<&MediaItem> for InputMedia {
    fn from(item: &MediaItem) -> Self {
        Self {
            kind: item.kind,
            media: item.file_id.clone(),
        }
    }
}

#[derive(Serialize)]
struct ForwardMessageRequest {
    chat_id: ChatId,
    from_chat_id: ChatId,
    message_id: MessageId,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ApiUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: MessageId,
    #[serde(default)]
    from: Option<ApiUser>,
    chat: ApiChat,
    #[serde(default)]
    date: i64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    photo: Option<Vec<ApiFile>>,
    #[serde(default)]
    video: Option<ApiFile>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChat {
    id: ChatId,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    file_id: String,
}

impl From<ApiUser> for SenderProfile {
    fn from(user: ApiUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

impl ApiUpdate {
    fn into_inbound(self) -> InboundUpdate {
        let event = self
            .message
            .map(ApiMessage::into_event)
            .unwrap_or(InboundEvent::Ignored);
        InboundUpdate {
            update_id: self.update_id,
            event,
        }
    }
}

impl ApiMessage {
    fn into_event(self) -> InboundEvent {
        // 频道消息等没有发送者，不参与按发送者缓冲
        let Some(from) = self.from else {
            return InboundEvent::Ignored;
        };
        let sender = SenderProfile::from(from);

        // 照片有多个尺寸，最后一个最大
        let media = match (self.photo, self.video) {
            (Some(mut sizes), _) if !sizes.is_empty() => sizes.pop().map(|f| (MediaKind::Photo, f)),
            (_, Some(video)) => Some((MediaKind::Video, video)),
            _ => None,
        };

        if let Some((kind, file)) = media {
            let received_at = Utc
                .timestamp_opt(self.date, 0)
                .single()
                .unwrap_or_else(Utc::now);
            return InboundEvent::Media(MediaItem {
                sender,
                chat_id: self.chat.id,
                message_id: self.message_id,
                kind,
                file_id: file.file_id,
                received_at,
            });
        }

        match self.text {
            Some(text) => InboundEvent::Text {
                sender,
                chat_id: self.chat.id,
                text,
            },
            None => InboundEvent::Ignored,
        }
    }
}
