// ExecutionStrategy - バッチの実行方式
// 逐次・無制限並行・固定ワーカープールの3方式を同じ契約で切り替える

use super::work_queue::{WorkConsumer, WorkQueue};
use crate::core::{BenchError, BenchResult, ItemProcessor, TaskItem};
use crate::services::config::RunConfig;
use async_trait::async_trait;
use mockall::automock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

/// バッチ実行方式のトレイト
///
/// `processor.process` は各アイテムにつき必ず1回呼ばれ、全呼び出しが
/// 終わるまで戻らない。
#[automock]
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// バッチ全体を処理
    async fn execute(
        &self,
        items: Vec<TaskItem>,
        processor: Arc<dyn ItemProcessor>,
    ) -> BenchResult<()>;

    /// ログ用の方式名
    fn kind(&self) -> &'static str;
}

/// 設定から実行方式を選択
pub fn select_strategy(config: &RunConfig) -> Box<dyn ExecutionStrategy> {
    match (config.is_concurrent(), config.use_pool()) {
        (false, _) => Box::new(Sequential),
        (true, true) => Box::new(WorkerPool::new(config.worker_count())),
        (true, false) => Box::new(NaiveConcurrent),
    }
}

/// 1アイテムを処理し、パニックした場合は `false`
///
/// 1件のパニックで残りのアイテムが処理されなくなることを防ぐ。
fn process_guarded(processor: &dyn ItemProcessor, item: &TaskItem) -> bool {
    match catch_unwind(AssertUnwindSafe(|| processor.process(item))) {
        Ok(()) => true,
        Err(_) => {
            error!(task_id = %item.id, "アイテム処理中にパニックが発生しました");
            false
        }
    }
}

fn ensure_no_panics(panicked: usize) -> BenchResult<()> {
    if panicked == 0 {
        Ok(())
    } else {
        Err(BenchError::execution(format!(
            "{panicked}件の処理でパニックが発生しました"
        )))
    }
}

/// 逐次実行: リスト順に1件ずつ
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequential;

#[async_trait]
impl ExecutionStrategy for Sequential {
    async fn execute(
        &self,
        items: Vec<TaskItem>,
        processor: Arc<dyn ItemProcessor>,
    ) -> BenchResult<()> {
        // 単一のブロッキングスレッド上で順番に処理
        let panicked = tokio::task::spawn_blocking(move || {
            items
                .iter()
                .filter(|item| !process_guarded(processor.as_ref(), item))
                .count()
        })
        .await?;

        ensure_no_panics(panicked)
    }

    fn kind(&self) -> &'static str {
        "sequential"
    }
}

/// 無制限並行: アイテムごとに専用のOSスレッドを即時起動
///
/// 同時実行数の上限を持たない比較用のベースライン。tokioのブロッキング
/// プールは上限（既定512）を持つため使わず、同時実行数は常にバッチ件数と等しい。
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveConcurrent;

/// 全アイテムを1件1スレッドで処理し、パニック件数を返す
///
/// スレッドを起動できなかった場合は、起動済みの分を待ってからエラーを返す。
fn run_thread_per_item(items: &[TaskItem], processor: &dyn ItemProcessor) -> BenchResult<usize> {
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(items.len());
        let mut spawn_error = None;
        for (index, item) in items.iter().enumerate() {
            let spawned = thread::Builder::new()
                .name(format!("naive-{index}"))
                .spawn_scoped(scope, move || process_guarded(processor, item));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    spawn_error = Some(error);
                    break;
                }
            }
        }
        let spawned = handles.len();
        debug!(spawned, "全スレッドを起動しました");

        let panicked = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(false))
            .filter(|completed| !completed)
            .count();

        match spawn_error {
            None => Ok(panicked),
            Some(error) => Err(BenchError::execution(format!(
                "{}件中{spawned}件を起動した時点でスレッドを起動できません: {error}",
                items.len()
            ))),
        }
    })
}

#[async_trait]
impl ExecutionStrategy for NaiveConcurrent {
    async fn execute(
        &self,
        items: Vec<TaskItem>,
        processor: Arc<dyn ItemProcessor>,
    ) -> BenchResult<()> {
        // スレッドのjoinで非同期ランタイムを塞がないよう、外側だけブロッキングプールで待つ
        let panicked = tokio::task::spawn_blocking(move || {
            run_thread_per_item(&items, processor.as_ref())
        })
        .await??;

        ensure_no_panics(panicked)
    }

    fn kind(&self) -> &'static str {
        "naive_concurrent"
    }
}

/// 固定ワーカープール: `worker_count` 本の長寿命ワーカースレッドが共有キューから取り出す
///
/// ワーカーはOSスレッドなので、ワーカー数がブロッキングプールの上限を超えても
/// 同時実行数はワーカー数と等しい。
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self { worker_count }
    }
}

/// 単一ワーカー。キューがclose済みで空になるまで取り出し続け、パニック件数を返す
fn spawn_pool_worker(
    worker_id: usize,
    consumer: WorkConsumer<TaskItem>,
    processor: Arc<dyn ItemProcessor>,
) -> std::io::Result<thread::JoinHandle<usize>> {
    thread::Builder::new()
        .name(format!("pool-worker-{worker_id}"))
        .spawn(move || {
            let mut handled = 0usize;
            let mut panicked = 0usize;
            while let Some(item) = consumer.pop() {
                handled += 1;
                if !process_guarded(processor.as_ref(), &item) {
                    panicked += 1;
                }
            }
            debug!(worker_id, handled, "ワーカー終了");
            panicked
        })
}

/// 全ワーカーの終了を待ち、パニック件数の合計を返す
async fn join_workers(workers: Vec<thread::JoinHandle<usize>>) -> BenchResult<usize> {
    let panicked = tokio::task::spawn_blocking(move || {
        workers
            .into_iter()
            // ワーカー自体の異常終了は1件として数える
            .map(|worker| worker.join().unwrap_or(1))
            .sum::<usize>()
    })
    .await?;
    Ok(panicked)
}

#[async_trait]
impl ExecutionStrategy for WorkerPool {
    async fn execute(
        &self,
        items: Vec<TaskItem>,
        processor: Arc<dyn ItemProcessor>,
    ) -> BenchResult<()> {
        if self.worker_count == 0 {
            return Err(BenchError::configuration(
                "ワーカープールのワーカー数は1以上である必要があります",
            ));
        }

        // 容量はバッチ件数以上
        let mut queue = WorkQueue::bounded(items.len());

        // ワーカーを先に全て起動してから投入
        let mut workers = Vec::with_capacity(self.worker_count);
        for worker_id in 0..self.worker_count {
            match spawn_pool_worker(worker_id, queue.consumer(), Arc::clone(&processor)) {
                Ok(worker) => workers.push(worker),
                Err(error) => {
                    queue.close();
                    join_workers(workers).await?;
                    return Err(BenchError::execution(format!(
                        "ワーカー{worker_id}を起動できません: {error}"
                    )));
                }
            }
        }

        for item in items {
            queue.push(item)?;
        }
        queue.close();

        let panicked = join_workers(workers).await?;
        ensure_no_panics(panicked)
    }

    fn kind(&self) -> &'static str {
        "worker_pool"
    }
}
