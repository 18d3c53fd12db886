//! 相册中继服务错误类型定义

use thiserror::Error;

/// 相册中继服务错误类型
#[derive(Debug, Error)]
pub enum AlbumError {
    /// 投递失败（网络或网关 API 临时错误），不重试
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// 网关返回了非成功响应
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 活动日志读写错误
    #[error("Activity trail error: {0}")]
    ActivityTrail(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 相册中继服务结果类型
pub type AlbumResult<T> = Result<T, AlbumError>;

impl From<reqwest::Error> for AlbumError {
    fn from(err: reqwest::Error) -> Self {
        AlbumError::Delivery(err.to_string())
    }
}

impl AlbumError {
    /// 是否为投递类临时错误
    pub fn is_transient(&self) -> bool {
        matches!(self, AlbumError::Delivery(_) | AlbumError::Gateway(_))
    }
}
