//! 闲置缓冲回收器
//!
//! 定期扫描缓冲表，回收长时间没有新条目的发送者缓冲。
//! 正常路径由防抖定时器分发，这里只兜底丢失的定时器。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

use crate::domain::service::buffer_manager::BufferManager;

pub struct IdleReclaimer {
    buffers: Arc<BufferManager>,
    stale_after: Duration,
    period: Duration,
}

impl IdleReclaimer {
    pub fn new(buffers: Arc<BufferManager>, stale_after: Duration, period: Duration) -> Self {
        Self {
            buffers,
            stale_after,
            period,
        }
    }

    /// 以当前时间执行一次扫描
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// 以给定时间执行一次扫描，返回回收的缓冲数
    pub fn sweep_at(&self, now: Instant) -> usize {
        let evicted = self.buffers.evict_stale(now, self.stale_after);
        for buffer in &evicted {
            warn!(
                sender_id = buffer.sender_id,
                items = buffer.items,
                stale_after_secs = self.stale_after.as_secs(),
                "Reclaimed idle sender buffer"
            );
        }
        evicted.len()
    }

    /// 启动后台回收循环，`shutdown` 变为 true 时退出
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                period_secs = self.period.as_secs(),
                stale_after_secs = self.stale_after.as_secs(),
                "Idle reclaimer started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Idle reclaimer stopped");
        })
    }
}
