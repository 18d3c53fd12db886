//! 相册中继服务
//!
//! 按发送者缓冲媒体，防抖窗口到期后以最多 10 项一组的相册回传，
//! 同时镜像给审核接收者并记录活动日志。

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interface;
pub mod service;

pub use config::AlbumRelayConfig;
pub use error::{AlbumError, AlbumResult};
pub use service::{ApplicationBootstrap, ApplicationContext};
