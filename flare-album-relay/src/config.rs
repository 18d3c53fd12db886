//! 相册中继服务配置
//!
//! 环境变量优先于配置文件，未设置时使用默认值。

use std::env;
use std::str::FromStr;
use std::time::Duration;

use flare_album_core::config::AlbumAppConfig;
use tracing::warn;

use crate::domain::model::ChatId;

/// 单个相册的条目上限（网关限制）
pub const MAX_GROUP_SIZE_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct AlbumRelayConfig {
    pub service_name: String,
    pub gateway_base_url: String,
    pub gateway_token: Option<String>,
    pub oversight_chat_id: Option<ChatId>,
    pub debounce_window_ms: u64,
    pub max_group_size: usize,
    pub forward_pacing_ms: u64,
    pub stale_after_secs: u64,
    pub reclaim_interval_secs: u64,
    pub activity_log_path: String,
    pub activity_tail_lines: usize,
    pub poll_timeout_secs: u64,
    pub media_group_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for AlbumRelayConfig {
    fn default() -> Self {
        Self::from_app_config(&AlbumAppConfig::default())
    }
}

impl AlbumRelayConfig {
    pub fn from_app_config(app: &AlbumAppConfig) -> Self {
        let service = app.album_relay_service();
        let gateway = &app.gateway;

        let service_name = service
            .service_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "flare-album-relay".to_string());

        let gateway_base_url = env::var("ALBUM_RELAY_GATEWAY_URL")
            .ok()
            .or_else(|| gateway.base_url.clone())
            .unwrap_or_else(|| "https://api.telegram.org".to_string());

        let gateway_token = env::var("ALBUM_RELAY_BOT_TOKEN")
            .ok()
            .or_else(|| gateway.token.clone())
            .filter(|token| !token.is_empty());

        // 0 表示未配置审核接收者
        let oversight_chat_id = env_parse::<ChatId>("ALBUM_RELAY_ADMIN_ID")
            .or(service.oversight_chat_id)
            .filter(|id| *id != 0);

        let debounce_window_ms = env_parse("ALBUM_RELAY_DEBOUNCE_MS")
            .or(service.debounce_window_ms)
            .unwrap_or(1500);

        let max_group_size = env_parse("ALBUM_RELAY_GROUP_SIZE")
            .or(service.max_group_size)
            .unwrap_or(MAX_GROUP_SIZE_LIMIT)
            .clamp(1, MAX_GROUP_SIZE_LIMIT);

        let forward_pacing_ms = env_parse("ALBUM_RELAY_FORWARD_PACING_MS")
            .or(service.forward_pacing_ms)
            .unwrap_or(100);

        let stale_after_secs = env_parse("ALBUM_RELAY_STALE_AFTER_SECS")
            .or(service.stale_after_secs)
            .unwrap_or(300);
        let stale_after_secs = staleness_above_debounce(debounce_window_ms, stale_after_secs);

        let reclaim_interval_secs = env_parse("ALBUM_RELAY_RECLAIM_INTERVAL_SECS")
            .or(service.reclaim_interval_secs)
            .unwrap_or(stale_after_secs)
            .max(1);

        let activity_log_path = env::var("ALBUM_RELAY_ACTIVITY_LOG")
            .ok()
            .or_else(|| service.activity_log_path.clone())
            .unwrap_or_else(|| "bot_activity.log".to_string());

        let activity_tail_lines = service.activity_tail_lines.unwrap_or(20);

        let poll_timeout_secs = env_parse("ALBUM_RELAY_POLL_TIMEOUT_SECS")
            .or(gateway.poll_timeout_secs)
            .unwrap_or(30);

        let media_group_timeout_secs = gateway.media_group_timeout_secs.unwrap_or(120);

        let shutdown_grace_secs = env_parse("ALBUM_RELAY_SHUTDOWN_GRACE_SECS")
            .or(service.shutdown_grace_secs)
            .unwrap_or(10);

        Self {
            service_name,
            gateway_base_url,
            gateway_token,
            oversight_chat_id,
            debounce_window_ms,
            max_group_size,
            forward_pacing_ms,
            stale_after_secs,
            reclaim_interval_secs,
            activity_log_path,
            activity_tail_lines,
            poll_timeout_secs,
            media_group_timeout_secs,
            shutdown_grace_secs,
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn forward_pacing(&self) -> Duration {
        Duration::from_millis(self.forward_pacing_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// 过期时间必须长于防抖窗口，否则回收器可能回收定时器尚未到期的缓冲，
/// 旧定时器随后会提前取走同一发送者新开的缓冲
fn staleness_above_debounce(debounce_window_ms: u64, stale_after_secs: u64) -> u64 {
    let min_secs = debounce_window_ms / 1000 + 1;
    if stale_after_secs < min_secs {
        warn!(
            debounce_window_ms,
            stale_after_secs,
            adjusted_secs = min_secs,
            "stale_after must exceed the debounce window, raising it"
        );
        return min_secs;
    }
    stale_after_secs
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flare_album_core::config::{AlbumRelayServiceConfig, ServicesConfig};

    #[test]
    fn test_file_values_are_normalised() {
        let app = AlbumAppConfig {
            services: ServicesConfig {
                album_relay: Some(AlbumRelayServiceConfig {
                    oversight_chat_id: Some(0),
                    max_group_size: Some(50),
                    stale_after_secs: Some(120),
                    ..Default::default()
                }),
            },
            ..Default::default()
        };

        let config = AlbumRelayConfig::from_app_config(&app);
        if env::var("ALBUM_RELAY_ADMIN_ID").is_err() {
            assert_eq!(config.oversight_chat_id, None);
        }
        if env::var("ALBUM_RELAY_GROUP_SIZE").is_err() {
            assert_eq!(config.max_group_size, MAX_GROUP_SIZE_LIMIT);
        }
        if env::var("ALBUM_RELAY_STALE_AFTER_SECS").is_err()
            && env::var("ALBUM_RELAY_RECLAIM_INTERVAL_SECS").is_err()
        {
            // 回收间隔默认跟随过期窗口
            assert_eq!(config.reclaim_interval_secs, 120);
        }
    }

    #[test]
    fn test_staleness_is_raised_above_debounce_window() {
        assert_eq!(staleness_above_debounce(1500, 300), 300);
        assert_eq!(staleness_above_debounce(1500, 1), 2);
        assert_eq!(staleness_above_debounce(5000, 5), 6);
        assert_eq!(staleness_above_debounce(0, 0), 1);
    }

    #[test]
    fn test_file_staleness_below_debounce_is_adjusted() {
        let app = AlbumAppConfig {
            services: ServicesConfig {
                album_relay: Some(AlbumRelayServiceConfig {
                    debounce_window_ms: Some(4000),
                    stale_after_secs: Some(3),
                    ..Default::default()
                }),
            },
            ..Default::default()
        };

        let config = AlbumRelayConfig::from_app_config(&app);
        if env::var("ALBUM_RELAY_DEBOUNCE_MS").is_err()
            && env::var("ALBUM_RELAY_STALE_AFTER_SECS").is_err()
        {
            assert_eq!(config.stale_after_secs, 5);
            assert!(config.stale_after() > config.debounce_window());
        }
    }

    #[test]
    fn test_defaults() {
        let config = AlbumRelayConfig::from_app_config(&AlbumAppConfig::default());
        assert_eq!(config.service_name, "flare-album-relay");
        assert_eq!(config.activity_tail_lines, 20);
        assert_eq!(config.media_group_timeout_secs, 120);
        if env::var("ALBUM_RELAY_SHUTDOWN_GRACE_SECS").is_err() {
            assert_eq!(config.shutdown_grace(), Duration::from_secs(10));
        }
        if env::var("ALBUM_RELAY_DEBOUNCE_MS").is_err() {
            assert_eq!(config.debounce_window(), Duration::from_millis(1500));
        }
    }
}
