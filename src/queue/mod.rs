use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use tokio::sync::mpsc;

use crate::core::TaskItem;

pub mod memory;
pub mod spool;

/// ブローカーから配信された1メッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// ack用の配信タグ（購読内で一意）
    pub tag: u64,
    /// メッセージ本文（JSON）
    pub body: Vec<u8>,
}

/// 手動ackの耐久キューを表すトレイト
#[automock]
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// タスクを1件発行
    async fn publish(&self, item: &TaskItem) -> Result<()>;

    /// 購読を開始し、配信ストリームを返す
    ///
    /// ackされなかったメッセージは次の購読で再配信される。
    async fn consume(&self) -> Result<mpsc::UnboundedReceiver<Delivery>>;

    /// 配信タグを指定してack
    async fn ack(&self, tag: u64) -> Result<()>;
}

// TaskQueue for Box<dyn TaskQueue>
#[async_trait]
impl TaskQueue for Box<dyn TaskQueue> {
    async fn publish(&self, item: &TaskItem) -> Result<()> {
        self.as_ref().publish(item).await
    }

    async fn consume(&self) -> Result<mpsc::UnboundedReceiver<Delivery>> {
        self.as_ref().consume().await
    }

    async fn ack(&self, tag: u64) -> Result<()> {
        self.as_ref().ack(tag).await
    }
}

pub use memory::MemoryQueue;
pub use spool::SpoolQueue;
