// WorkQueue - ワーカープール用のMPMC FIFOキュー
// close後は全ワーカーがキューを空にした時点で終了を観測する

use crate::core::{BenchError, BenchResult};

/// 複数producer・複数consumerの作業キュー
pub struct WorkQueue<T> {
    tx: Option<flume::Sender<T>>,
    rx: flume::Receiver<T>,
}

impl<T> WorkQueue<T> {
    /// 容量を指定して作成（0は1に切り上げ）
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = flume::bounded(capacity.max(1));
        Self { tx: Some(tx), rx }
    }

    /// アイテムを投入。容量超過やclose後はエラー
    pub fn push(&self, item: T) -> BenchResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| BenchError::execution("クローズ済みの作業キューへの投入"))?;
        tx.try_send(item).map_err(|e| match e {
            flume::TrySendError::Full(_) => BenchError::execution("作業キューの容量が不足しています"),
            flume::TrySendError::Disconnected(_) => {
                BenchError::execution("作業キューの受信側が全て終了しています")
            }
        })
    }

    /// これ以上投入しないことを通知
    pub fn close(&mut self) {
        self.tx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    /// ワーカー用の取り出し口を作成
    pub fn consumer(&self) -> WorkConsumer<T> {
        WorkConsumer {
            rx: self.rx.clone(),
        }
    }
}

/// ワーカー側の取り出し口
pub struct WorkConsumer<T> {
    rx: flume::Receiver<T>,
}

impl<T> WorkConsumer<T> {
    /// 次のアイテムを取得（ブロッキング）
    ///
    /// キューがclose済みかつ空になると `None`。
    pub fn pop(&self) -> Option<T> {
        self.rx.recv().ok()
    }
}

impl<T> Clone for WorkConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fifo_order_for_single_consumer() {
        let mut queue = WorkQueue::bounded(3);
        let consumer = queue.consumer();
        for i in 0..3 {
            queue.push(i).unwrap();
        }
        queue.close();

        assert_eq!(consumer.pop(), Some(0));
        assert_eq!(consumer.pop(), Some(1));
        assert_eq!(consumer.pop(), Some(2));
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn test_push_after_close_fails() {
        let mut queue = WorkQueue::bounded(1);
        queue.close();

        assert!(queue.is_closed());
        assert!(queue.push(1).is_err());
    }

    #[test]
    fn test_push_beyond_capacity_fails() {
        let queue = WorkQueue::bounded(1);
        let _consumer = queue.consumer();

        queue.push(1).unwrap();
        assert!(queue.push(2).is_err());
    }

    #[test]
    fn test_all_consumers_observe_close() {
        let mut queue = WorkQueue::bounded(100);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let consumer = queue.consumer();
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    while let Some(item) = consumer.pop() {
                        seen.lock().unwrap().push(item);
                    }
                })
            })
            .collect();

        for i in 0..100 {
            queue.push(i).unwrap();
        }
        queue.close();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }
}
