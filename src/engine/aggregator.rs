// BatchAggregator - キューからの配信をバッチへ集約する
// 目標件数到達かタイムアウトのどちらか早い方でハンドラへ引き渡す

use crate::core::{Batch, BatchOutcome, BenchError, BenchResult, DispatchTrigger, TaskItem};
use crate::queue::TaskQueue;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// バッチバッファの事前確保上限（これを超える分は受信に応じて伸長）
const MAX_PREALLOCATED_ITEMS: usize = 1024;

/// キュー購読からバッチを1つ組み立てる集約器
pub struct BatchAggregator<Q: TaskQueue> {
    queue: Arc<Q>,
}

impl<Q: TaskQueue> BatchAggregator<Q> {
    pub fn new(queue: Arc<Q>) -> Self {
        Self { queue }
    }

    /// バッチを1つ集約してハンドラを呼び出す
    ///
    /// タイマーは購読開始時に一度だけ起動し、アイテム受信ごとにリセットしない。
    /// ハンドラが成功した場合のみ、全アイテムを到着順にackする。
    pub async fn consume_batch<F, Fut>(
        &self,
        target_size: usize,
        timeout: Duration,
        handler: F,
    ) -> BenchResult<BatchOutcome>
    where
        F: FnOnce(Vec<TaskItem>) -> Fut,
        Fut: Future<Output = BenchResult<()>>,
    {
        if target_size == 0 {
            return Err(BenchError::configuration(
                "バッチサイズは1以上である必要があります",
            ));
        }

        let mut deliveries = self
            .queue
            .consume()
            .await
            .map_err(|e| BenchError::queue_connection(format!("購読を開始できません: {e:#}")))?;

        info!(target_size, timeout_secs = timeout.as_secs_f64(), "バッチ集約を開始します");

        let mut batch = Batch::with_capacity(target_size.min(MAX_PREALLOCATED_ITEMS));
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let trigger = loop {
            tokio::select! {
                biased;

                delivery = deliveries.recv() => {
                    let Some(delivery) = delivery else {
                        warn!(pending = batch.len(), "バッチ確定前に購読が閉じられました");
                        return Ok(BatchOutcome::QueueClosed { pending: batch.len() });
                    };

                    match TaskItem::decode(&delivery.body) {
                        Ok(item) => {
                            debug!(task_id = %item.id, tag = delivery.tag, "アイテムを受信しました");
                            batch.push(item, delivery.tag);
                            if batch.len() >= target_size {
                                break DispatchTrigger::TargetReached;
                            }
                        }
                        // ackせずに破棄し、ブローカーの再配信に任せる
                        Err(error) => {
                            warn!(tag = delivery.tag, %error, "不正なメッセージを破棄しました");
                        }
                    }
                }

                _ = &mut deadline => {
                    if batch.is_empty() {
                        info!("タイムアウトまでにアイテムが届きませんでした");
                        return Ok(BatchOutcome::Idle);
                    }
                    break DispatchTrigger::Timeout;
                }
            }
        };

        // 以降の配信は受け取らない（未ack分は次の購読で再配信される）
        drop(deliveries);

        let (items, ack_tags) = batch.into_parts();
        let item_count = items.len();
        info!(item_count, ?trigger, "バッチを引き渡します");

        handler(items).await?;

        self.ack_all(&ack_tags).await?;

        Ok(BatchOutcome::Dispatched {
            item_count,
            trigger,
        })
    }

    /// 全タグのackを試み、失敗があれば最初のエラーを返す
    async fn ack_all(&self, ack_tags: &[u64]) -> BenchResult<()> {
        let mut first_error = None;
        let mut failed = 0usize;

        for &tag in ack_tags {
            if let Err(error) = self.queue.ack(tag).await {
                warn!(tag, error = %error, "ackに失敗しました");
                failed += 1;
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            None => Ok(()),
            Some(error) => Err(BenchError::queue_operation(
                format!("ack ({failed}/{} 件失敗)", ack_tags.len()),
                error,
            )),
        }
    }
}
