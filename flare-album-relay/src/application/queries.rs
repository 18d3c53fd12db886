//! 查询结构体定义（Query DTO）

/// 查询缓冲快照（活跃发送者数、缓冲条目总数）
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBufferStatsQuery;

/// 查询最近的活动日志
#[derive(Debug, Clone, Copy)]
pub struct QueryRecentActivityQuery {
    /// 返回的最大行数
    pub limit: usize,
}

impl Default for QueryRecentActivityQuery {
    fn default() -> Self {
        Self { limit: 20 }
    }
}
