use super::{Delivery, TaskQueue};
use crate::core::TaskItem;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// スプールディレクトリの新着確認間隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct SpoolState {
    next_tag: u64,
    in_flight: HashMap<u64, PathBuf>,
}

/// ディスク上のスプールディレクトリによる耐久キュー
///
/// 1メッセージ = 1 JSONファイル。発行は一時ファイルへの書き込み後に
/// リネームするため、購読側が書きかけのファイルを読むことはない。
/// ackでファイルを削除し、未ackのファイルは次の購読で再配信される。
#[derive(Debug, Clone)]
pub struct SpoolQueue {
    dir: PathBuf,
    poll_interval: Duration,
    sequence: Arc<AtomicU64>,
    state: Arc<Mutex<SpoolState>>,
}

impl SpoolQueue {
    /// スプールディレクトリを開く（無ければ作成）
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to open spool directory: {}", dir.display()))?;

        Ok(Self {
            dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
            sequence: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(SpoolState::default())),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// スプール内のメッセージファイル数
    pub async fn message_count(&self) -> Result<usize> {
        Ok(list_messages(&self.dir).await?.len())
    }

    fn message_file_name(&self, item: &TaskItem) -> String {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .max(0);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id: String = item
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{nanos:020}-{seq:06}-{id}.json")
    }
}

/// 配信対象のメッセージファイルを名前順で列挙
async fn list_messages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read spool directory: {}", dir.display()))?;

    let mut messages = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_message = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| !name.starts_with('.') && name.ends_with(".json"));
        if is_message && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            messages.push(path);
        }
    }

    messages.sort();
    Ok(messages)
}

#[async_trait]
impl TaskQueue for SpoolQueue {
    async fn publish(&self, item: &TaskItem) -> Result<()> {
        let body = item.encode()?;
        let name = self.message_file_name(item);
        let tmp_path = self.dir.join(format!(".{name}.tmp"));
        let final_path = self.dir.join(&name);

        tokio::fs::write(&tmp_path, &body)
            .await
            .with_context(|| format!("Failed to write message: {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .with_context(|| format!("Failed to commit message: {}", final_path.display()))?;

        debug!(task_id = %item.id, file = %name, "メッセージを発行しました");
        Ok(())
    }

    async fn consume(&self) -> Result<mpsc::UnboundedReceiver<Delivery>> {
        // 接続確認に相当
        list_messages(&self.dir).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let dir = self.dir.clone();
        let state = Arc::clone(&self.state);
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut delivered: HashSet<PathBuf> = HashSet::new();
            while !tx.is_closed() {
                match list_messages(&dir).await {
                    Ok(paths) => {
                        for path in paths {
                            if delivered.contains(&path) {
                                continue;
                            }
                            // 他の購読者がack済みなら読めない
                            let Ok(body) = tokio::fs::read(&path).await else {
                                continue;
                            };

                            let tag = {
                                let Ok(mut state) = state.lock() else {
                                    return;
                                };
                                state.next_tag += 1;
                                let tag = state.next_tag;
                                state.in_flight.insert(tag, path.clone());
                                tag
                            };

                            if tx.send(Delivery { tag, body }).is_err() {
                                if let Ok(mut state) = state.lock() {
                                    state.in_flight.remove(&tag);
                                }
                                return;
                            }
                            delivered.insert(path);
                        }
                    }
                    Err(error) => warn!(%error, "スプールディレクトリの読み取りに失敗しました"),
                }
                tokio::time::sleep(poll_interval).await;
            }
        });

        Ok(rx)
    }

    async fn ack(&self, tag: u64) -> Result<()> {
        let path = self
            .state
            .lock()
            .map_err(|_| anyhow!("spool state lock poisoned"))?
            .in_flight
            .remove(&tag)
            .ok_or_else(|| anyhow!("unknown delivery tag: {tag}"))?;

        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to ack message: {}", path.display()))
    }
}
