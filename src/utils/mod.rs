//! 工具函数模块
//!
//! 活动日志时间格式化与按字符截断

use chrono::{DateTime, Local};

/// 活动日志使用的时间格式
pub const ACTIVITY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 按活动日志格式输出本地时间
pub fn format_activity_time(at: &DateTime<Local>) -> String {
    at.format(ACTIVITY_TIME_FORMAT).to_string()
}

/// 按字符数截断文本，不会切断多字节字符
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
