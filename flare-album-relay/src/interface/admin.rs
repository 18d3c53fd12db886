//! 管理命令（仅响应审核接收者）
//!
//! - `/admin`：缓冲状态与命令列表
//! - `/logs`：最近的活动日志

use std::sync::Arc;

use flare_album_core::utils::truncate_chars;

use crate::application::AlbumQueryHandler;
use crate::application::queries::{QueryBufferStatsQuery, QueryRecentActivityQuery};

/// 日志回复的最大字符数（网关单条消息限制）
pub const LOGS_REPLY_MAX_CHARS: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Status,
    Logs,
}

impl AdminCommand {
    /// 解析命令文本，允许 `/logs@botname` 形式
    pub fn parse(text: &str) -> Option<Self> {
        let command = text.split_whitespace().next()?;
        let command = command.split('@').next().unwrap_or(command);
        match command {
            "/admin" => Some(AdminCommand::Status),
            "/logs" => Some(AdminCommand::Logs),
            _ => None,
        }
    }
}

pub struct AdminConsole {
    queries: Arc<AlbumQueryHandler>,
    tail_lines: usize,
}

impl AdminConsole {
    pub fn new(queries: Arc<AlbumQueryHandler>, tail_lines: usize) -> Self {
        Self {
            queries,
            tail_lines,
        }
    }

    /// 生成命令的回复文本
    pub async fn respond(&self, command: AdminCommand) -> String {
        match command {
            AdminCommand::Status => self.render_status(),
            AdminCommand::Logs => self.render_logs().await,
        }
    }

    fn render_status(&self) -> String {
        let stats = self.queries.query_buffer_stats(QueryBufferStatsQuery);
        format!(
            "📊 Bot status:\n• Active users: {}\n• Files in processing: {}\n\nAvailable commands:\n/logs - View recent logs",
            stats.active_senders, stats.buffered_items
        )
    }

    async fn render_logs(&self) -> String {
        let query = QueryRecentActivityQuery {
            limit: self.tail_lines,
        };
        match self.queries.query_recent_activity(query).await {
            Ok(lines) if lines.is_empty() => "Logs are empty".to_string(),
            Ok(lines) => {
                let mut text = String::from("📋 Recent operations:\n\n");
                for line in &lines {
                    text.push_str(line);
                    text.push('\n');
                }
                truncate_chars(&text, LOGS_REPLY_MAX_CHARS).to_string()
            }
            Err(e) => format!("Failed to read logs: {e}"),
        }
    }
}
