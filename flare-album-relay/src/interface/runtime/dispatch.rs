//! 分发运行时
//!
//! 接收到期的防抖定时器，每个发送者的分发在独立任务中执行。
//! 停机时在宽限期内等待进行中的分发，超时后中止并报告丢失的条目。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

use crate::application::AlbumCommandHandler;
use crate::application::commands::DispatchSenderCommand;
use crate::domain::model::SenderId;

/// 停机时分发任务的收尾结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchDrain {
    /// 宽限期内完成的分发
    pub completed: usize,
    /// 宽限期后被中止的分发
    pub aborted: usize,
    /// 被中止的分发已取出但未完成的条目数
    pub aborted_items: usize,
}

pub struct DispatchRuntime {
    fired_rx: mpsc::UnboundedReceiver<SenderId>,
    commands: Arc<AlbumCommandHandler>,
    shutdown_grace: Duration,
    tasks: JoinSet<()>,
}

impl DispatchRuntime {
    pub fn new(
        fired_rx: mpsc::UnboundedReceiver<SenderId>,
        commands: Arc<AlbumCommandHandler>,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            fired_rx,
            commands,
            shutdown_grace,
            tasks: JoinSet::new(),
        }
    }

    /// 持续处理到期定时器，直到 `shutdown` 变为 true 或定时器通道关闭
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> DispatchDrain {
        info!("Starting dispatch runtime");

        loop {
            tokio::select! {
                fired = self.fired_rx.recv() => {
                    let Some(sender_id) = fired else {
                        break;
                    };
                    let commands = Arc::clone(&self.commands);
                    self.tasks.spawn(async move {
                        commands
                            .handle_dispatch_sender(DispatchSenderCommand { sender_id })
                            .await;
                    });
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "dispatch task ended abnormally");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if !self.fired_rx.is_empty() {
            warn!(
                pending = self.fired_rx.len(),
                "Dispatch runtime stopped with pending timers"
            );
        }

        let drain = self.finish().await;
        info!(
            completed = drain.completed,
            aborted = drain.aborted,
            "Dispatch runtime stopped"
        );
        drain
    }

    async fn finish(&mut self) -> DispatchDrain {
        let mut drain = DispatchDrain::default();
        if self.tasks.is_empty() {
            return drain;
        }

        info!(
            in_flight = self.tasks.len(),
            grace_ms = self.shutdown_grace.as_millis() as u64,
            "Waiting for in-flight dispatches"
        );

        let deadline = Instant::now() + self.shutdown_grace;
        while let Ok(Some(joined)) = timeout_at(deadline, self.tasks.join_next()).await {
            drain.completed += 1;
            if let Err(e) = joined {
                warn!(error = %e, "dispatch task ended abnormally");
            }
        }

        if !self.tasks.is_empty() {
            drain.aborted = self.tasks.len();
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}

            drain.aborted_items = self.commands.in_flight_items();
            warn!(
                aborted = drain.aborted,
                items = drain.aborted_items,
                "Dispatches aborted after shutdown grace period"
            );
        }

        drain
    }
}
