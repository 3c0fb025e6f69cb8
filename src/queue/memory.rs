use super::{Delivery, TaskQueue};
use crate::core::TaskItem;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct MemoryQueueState {
    next_tag: u64,
    backlog: VecDeque<Vec<u8>>,
    unacked: BTreeMap<u64, Vec<u8>>,
    acked: Vec<u64>,
    subscriber: Option<mpsc::UnboundedSender<Delivery>>,
}

impl MemoryQueueState {
    /// 現在の購読者へ配信。購読者がいなければバックログへ戻す
    fn deliver(&mut self, body: Vec<u8>) {
        let Some(subscriber) = self.subscriber.as_ref() else {
            self.backlog.push_back(body);
            return;
        };

        self.next_tag += 1;
        let tag = self.next_tag;
        match subscriber.send(Delivery {
            tag,
            body: body.clone(),
        }) {
            Ok(()) => {
                self.unacked.insert(tag, body);
            }
            Err(_) => {
                self.subscriber = None;
                self.backlog.push_back(body);
            }
        }
    }
}

/// プロセス内のキュー実装（テスト・ベンチマーク用）
///
/// 手動ackと再配信の振る舞いをブローカーと同じ形で再現する。
#[derive(Debug, Default, Clone)]
pub struct MemoryQueue {
    state: Arc<Mutex<MemoryQueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryQueueState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory queue lock poisoned"))
    }

    /// 任意の本文を発行（不正メッセージのテスト用）
    pub fn publish_raw(&self, body: impl Into<Vec<u8>>) -> Result<()> {
        self.lock()?.deliver(body.into());
        Ok(())
    }

    /// 購読を切断（ブローカー側の切断を再現）
    pub fn close_subscription(&self) -> Result<()> {
        self.lock()?.subscriber = None;
        Ok(())
    }

    /// ack済みタグ（ack順）
    pub fn acked_tags(&self) -> Vec<u64> {
        self.lock().map(|s| s.acked.clone()).unwrap_or_default()
    }

    /// 配信済み・未ackのメッセージ数
    pub fn unacked_count(&self) -> usize {
        self.lock().map(|s| s.unacked.len()).unwrap_or_default()
    }

    /// 未配信のメッセージ数
    pub fn backlog_count(&self) -> usize {
        self.lock().map(|s| s.backlog.len()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn publish(&self, item: &TaskItem) -> Result<()> {
        let body = item.encode()?;
        self.publish_raw(body)
    }

    async fn consume(&self) -> Result<mpsc::UnboundedReceiver<Delivery>> {
        let mut state = self.lock()?;
        let (tx, rx) = mpsc::unbounded_channel();

        // 前の購読で未ackだったものを先頭に戻して再配信
        let redelivered: Vec<Vec<u8>> = std::mem::take(&mut state.unacked).into_values().collect();
        for body in redelivered.into_iter().rev() {
            state.backlog.push_front(body);
        }

        state.subscriber = Some(tx);
        let backlog: Vec<Vec<u8>> = state.backlog.drain(..).collect();
        for body in backlog {
            state.deliver(body);
        }

        Ok(rx)
    }

    async fn ack(&self, tag: u64) -> Result<()> {
        let mut state = self.lock()?;
        state
            .unacked
            .remove(&tag)
            .ok_or_else(|| anyhow!("unknown delivery tag: {tag}"))?;
        state.acked.push(tag);
        Ok(())
    }
}
