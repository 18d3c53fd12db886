//! 基于文件的活动日志
//!
//! 每条记录一行，追加写入；写入由互斥锁串行化，保证并发分发时行不交错。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::model::ActivityRecord;
use crate::domain::repository::ActivityTrail;
use crate::error::AlbumResult;

pub struct FileActivityTrail {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileActivityTrail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ActivityTrail for FileActivityTrail {
    async fn record(&self, entry: &ActivityRecord) -> AlbumResult<()> {
        let line = format!("{entry}\n");

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AlbumResult<Vec<String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(limit);
        Ok(lines[start..].iter().map(|line| line.to_string()).collect())
    }
}
