// 高レベル公開API
// 集約・計測実行・結果出力を1バッチ分まとめて行う

use super::aggregator::BatchAggregator;
use super::runner::ExperimentRunner;
use super::strategy::ExecutionStrategy;
use crate::core::{BatchOutcome, BenchResult, ItemProcessor, ProcessMetrics, ResultSink};
use crate::queue::TaskQueue;
use std::sync::Arc;

/// キューからバッチを1つ取り出し、計測付きで処理して結果を1行追記する
///
/// 結果の追記はハンドラ内で行うため、追記に失敗したバッチはackされない。
pub async fn process_next_batch<Q, M, S>(
    aggregator: &BatchAggregator<Q>,
    runner: &ExperimentRunner<M>,
    strategy: &dyn ExecutionStrategy,
    processor: Arc<dyn ItemProcessor>,
    sink: &S,
) -> BenchResult<BatchOutcome>
where
    Q: TaskQueue,
    M: ProcessMetrics + 'static,
    S: ResultSink + ?Sized,
{
    let config = runner.config();
    aggregator
        .consume_batch(config.batch_size(), config.batch_timeout(), |items| async move {
            let result = runner.run(items, strategy, processor).await?;
            sink.append(&result)
        })
        .await
}
