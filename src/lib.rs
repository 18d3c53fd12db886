//! Flare Album Core 公共库
//!
//! 提供统一的配置加载、日志初始化与指标收集功能

pub mod config;
pub mod metrics;
pub mod tracing;
pub mod utils;

pub use config::{
    AlbumAppConfig, AlbumRelayServiceConfig, GatewayConfig, LoggingConfig, load_config,
};
pub use metrics::AlbumRelayMetrics;
pub use utils::*;
