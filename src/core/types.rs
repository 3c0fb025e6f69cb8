// ベンチマークで扱うデータ型定義

use super::error::BenchResult;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// キュー経由で配信される圧縮タスク
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub file_name: String,
}

impl TaskItem {
    pub fn new(id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
        }
    }

    /// メッセージ本文(JSON)からデコード
    pub fn decode(body: &[u8]) -> BenchResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// メッセージ本文(JSON)へエンコード
    pub fn encode(&self) -> BenchResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// 集約中のバッチ
///
/// `items[i]` と `ack_tags[i]` は常に対応する。
#[derive(Debug, Default)]
pub struct Batch {
    items: Vec<TaskItem>,
    ack_tags: Vec<u64>,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            ack_tags: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: TaskItem, ack_tag: u64) {
        self.items.push(item);
        self.ack_tags.push(ack_tag);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    /// バッチを凍結してアイテムとackタグに分解
    pub fn into_parts(self) -> (Vec<TaskItem>, Vec<u64>) {
        (self.items, self.ack_tags)
    }
}

/// バッチを引き渡した契機
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTrigger {
    /// 目標件数に到達
    TargetReached,
    /// タイムアウト時点で1件以上集まっていた
    Timeout,
}

/// `consume_batch` 1回分の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// ハンドラ成功・全件ack済み
    Dispatched {
        item_count: usize,
        trigger: DispatchTrigger,
    },
    /// タイムアウトまでに1件も届かなかった
    Idle,
    /// 購読が途中で閉じられた（未ackのまま破棄）
    QueueClosed { pending: usize },
}

/// 1バッチ分の計測結果（CSVの1行に対応）
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResult {
    pub timestamp: DateTime<Local>,
    pub scenario_name: String,
    pub item_count: usize,
    pub duration_seconds: f64,
    /// 計測不能な場合は `None`
    pub cpu_percent: Option<f64>,
    /// 計測不能な場合は `None`
    pub peak_memory_bytes: Option<u64>,
    pub worker_count: usize,
}

impl ExperimentResult {
    pub fn peak_memory_mb(&self) -> Option<f64> {
        self.peak_memory_bytes
            .map(|bytes| bytes as f64 / 1024.0 / 1024.0)
    }
}
