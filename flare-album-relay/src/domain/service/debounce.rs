//! 防抖定时器
//!
//! 每次 `arm` 启动一个一次性延时任务，到期后把发送者 ID 投递给分发运行时。
//! 定时器不可取消也不可重置，窗口从首个条目开始计算。

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::model::SenderId;

#[derive(Clone)]
pub struct DebounceTimer {
    window: Duration,
    fired_tx: mpsc::UnboundedSender<SenderId>,
}

impl DebounceTimer {
    /// 创建定时器，返回到期通知的接收端
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<SenderId>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (Self { window, fired_tx }, fired_rx)
    }

    /// 为发送者启动一次性定时，必须在 tokio 运行时内调用
    pub fn arm(&self, sender_id: SenderId) {
        let fired_tx = self.fired_tx.clone();
        let window = self.window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if fired_tx.send(sender_id).is_err() {
                debug!(sender_id, "dispatch runtime closed, dropping timer fire");
            }
        });
    }
}
