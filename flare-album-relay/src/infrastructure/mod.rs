//! 基础设施层：网关客户端与活动日志实现

pub mod activity;
pub mod gateway;

pub use activity::FileActivityTrail;
pub use gateway::{HttpGateway, HttpGatewayConfig};
