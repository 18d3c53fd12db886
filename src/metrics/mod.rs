//! # Prometheus 指标收集模块
//!
//! 为相册中继服务提供统一的 Prometheus 指标收集能力。

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 相册中继服务指标
#[derive(Clone)]
pub struct AlbumRelayMetrics {
    /// 进入缓冲的媒体条目总数
    pub items_admitted_total: IntCounter,
    /// 因消息 ID 重复被忽略的条目总数
    pub duplicates_rejected_total: IntCounter,
    /// 成功投递的相册总数
    pub groups_delivered_total: IntCounter,
    /// 投递失败的相册总数
    pub group_delivery_failures_total: IntCounter,
    /// 审核镜像失败次数
    pub mirror_failures_total: IntCounter,
    /// 被回收的闲置缓冲总数
    pub buffers_reclaimed_total: IntCounter,
    /// 当前活跃缓冲数量
    pub active_buffers: IntGauge,
    /// 单次批量分发耗时（秒）
    pub dispatch_duration_seconds: Histogram,
}

impl AlbumRelayMetrics {
    pub fn new() -> Self {
        let items_admitted_total = IntCounter::new(
            "album_items_admitted_total",
            "Total number of media items admitted into sender buffers",
        )
        .expect("Failed to create album_items_admitted_total metric");

        let duplicates_rejected_total = IntCounter::new(
            "album_duplicates_rejected_total",
            "Total number of media items ignored because of a duplicate message id",
        )
        .expect("Failed to create album_duplicates_rejected_total metric");

        let groups_delivered_total = IntCounter::new(
            "album_groups_delivered_total",
            "Total number of media groups delivered",
        )
        .expect("Failed to create album_groups_delivered_total metric");

        let group_delivery_failures_total = IntCounter::new(
            "album_group_delivery_failures_total",
            "Total number of media group deliveries that failed",
        )
        .expect("Failed to create album_group_delivery_failures_total metric");

        let mirror_failures_total = IntCounter::new(
            "album_mirror_failures_total",
            "Total number of mirror runs aborted by a gateway failure",
        )
        .expect("Failed to create album_mirror_failures_total metric");

        let buffers_reclaimed_total = IntCounter::new(
            "album_buffers_reclaimed_total",
            "Total number of idle sender buffers reclaimed",
        )
        .expect("Failed to create album_buffers_reclaimed_total metric");

        let active_buffers = IntGauge::new(
            "album_active_buffers",
            "Number of sender buffers currently pending dispatch",
        )
        .expect("Failed to create album_active_buffers metric");

        let dispatch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "album_dispatch_duration_seconds",
                "Sender batch dispatch duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]),
        )
        .expect("Failed to create album_dispatch_duration_seconds metric");

        // 注册指标，忽略重复注册错误（测试中可能会重复创建）
        let _ = REGISTRY.register(Box::new(items_admitted_total.clone()));
        let _ = REGISTRY.register(Box::new(duplicates_rejected_total.clone()));
        let _ = REGISTRY.register(Box::new(groups_delivered_total.clone()));
        let _ = REGISTRY.register(Box::new(group_delivery_failures_total.clone()));
        let _ = REGISTRY.register(Box::new(mirror_failures_total.clone()));
        let _ = REGISTRY.register(Box::new(buffers_reclaimed_total.clone()));
        let _ = REGISTRY.register(Box::new(active_buffers.clone()));
        let _ = REGISTRY.register(Box::new(dispatch_duration_seconds.clone()));

        Self {
            items_admitted_total,
            duplicates_rejected_total,
            groups_delivered_total,
            group_delivery_failures_total,
            mirror_failures_total,
            buffers_reclaimed_total,
            active_buffers,
            dispatch_duration_seconds,
        }
    }
}

/// 以 Prometheus 文本格式导出全局注册表
pub fn gather_text() -> prometheus::Result<String> {
    TextEncoder::new().encode_to_string(&REGISTRY.gather())
}

impl Default for AlbumRelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
