//! 查询处理器（编排层）- 轻量级，只负责编排领域服务

use std::sync::Arc;

use tracing::instrument;

use crate::application::queries::{QueryBufferStatsQuery, QueryRecentActivityQuery};
use crate::domain::model::BufferStats;
use crate::domain::repository::ActivityTrail;
use crate::domain::service::BufferManager;
use crate::error::AlbumResult;

/// 相册查询处理器（编排层）
pub struct AlbumQueryHandler {
    buffers: Arc<BufferManager>,
    trail: Arc<dyn ActivityTrail>,
}

impl AlbumQueryHandler {
    pub fn new(buffers: Arc<BufferManager>, trail: Arc<dyn ActivityTrail>) -> Self {
        Self { buffers, trail }
    }

    /// 查询缓冲快照
    #[instrument(skip(self, _query))]
    pub fn query_buffer_stats(&self, _query: QueryBufferStatsQuery) -> BufferStats {
        self.buffers.stats()
    }

    /// 查询最近的活动日志行
    #[instrument(skip(self), fields(limit = query.limit))]
    pub async fn query_recent_activity(
        &self,
        query: QueryRecentActivityQuery,
    ) -> AlbumResult<Vec<String>> {
        self.trail.recent(query.limit).await
    }
}
