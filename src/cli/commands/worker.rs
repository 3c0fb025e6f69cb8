use crate::cli::args::WorkerArgs;
use crate::core::{BatchOutcome, BenchError, BenchResult, ItemProcessor};
use crate::engine::{process_next_batch, select_strategy, BatchAggregator, ExperimentRunner};
use crate::queue::{SpoolQueue, TaskQueue};
use crate::services::{
    CodecSession, CodecSettings, CompressionProcessor, CsvResultSink, OsProcessMetrics, RunConfig,
    StorageConfig,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 0以下のバッチサイズは1として扱う
pub fn resolve_batch_size(raw: i64) -> usize {
    match usize::try_from(raw) {
        Ok(size) if size > 0 => size,
        _ => {
            warn!(batch_size = raw, "バッチサイズが不正なため1を使用します");
            1
        }
    }
}

/// 引数から実行設定を組み立てる
pub fn build_run_config(args: &WorkerArgs) -> RunConfig {
    let mut config = RunConfig::new()
        .with_concurrency(args.concurrent)
        .with_worker_pool(args.worker_pool)
        .with_batch_size(resolve_batch_size(args.batch_size))
        .with_batch_timeout(Duration::from_secs(args.batch_timeout_secs));
    if let Some(workers) = args.workers {
        config = config.with_worker_count(workers);
    }
    config
}

pub fn build_storage_config(args: &WorkerArgs) -> StorageConfig {
    StorageConfig::new(
        &args.storage.upload_dir,
        &args.compressed_dir,
        &args.result_file,
    )
}

/// 1バッチ分のワーカー処理
///
/// キューの種類に依存しない部分。結果はCSVへ1行追記される。
pub async fn run_worker<Q: TaskQueue>(
    queue: Arc<Q>,
    config: RunConfig,
    storage: StorageConfig,
    session: &CodecSession,
) -> BenchResult<BatchOutcome> {
    let processor: Arc<dyn ItemProcessor> = Arc::new(
        CompressionProcessor::new(session.codec(), storage.clone())
            .with_quality(session.settings().quality),
    );
    let sink = CsvResultSink::new(&storage.result_path);
    let strategy = select_strategy(&config);
    let runner = ExperimentRunner::new(config, Arc::new(OsProcessMetrics::current()));
    let aggregator = BatchAggregator::new(queue);

    process_next_batch(&aggregator, &runner, strategy.as_ref(), processor, &sink).await
}

/// `worker` サブコマンド
pub async fn execute_worker(args: WorkerArgs) -> Result<()> {
    let config = build_run_config(&args);
    config.validate()?;

    let storage = build_storage_config(&args);
    storage.ensure_output_dirs()?;

    info!(
        scenario = %config.scenario_name(),
        batch_size = config.batch_size(),
        timeout_secs = config.batch_timeout().as_secs(),
        upload_dir = %storage.upload_dir.display(),
        "ワーカーを起動します"
    );

    let session = CodecSession::startup(CodecSettings::default())?;

    let queue = SpoolQueue::open(&args.storage.queue_dir)
        .await
        .map_err(|e| BenchError::queue_connection(format!("{e:#}")))?;

    match run_worker(Arc::new(queue), config, storage, &session).await? {
        BatchOutcome::Dispatched {
            item_count,
            trigger,
        } => info!(item_count, ?trigger, "バッチ処理が完了しました"),
        BatchOutcome::Idle => info!("処理対象のタスクがありませんでした"),
        BatchOutcome::QueueClosed { pending } => {
            warn!(pending, "キューが閉じられたためバッチを破棄しました")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::StorageArgs;

    fn worker_args() -> WorkerArgs {
        WorkerArgs {
            storage: StorageArgs {
                upload_dir: "up".into(),
                queue_dir: "queue".into(),
            },
            compressed_dir: "out".into(),
            result_file: "results.csv".into(),
            concurrent: true,
            worker_pool: true,
            workers: Some(3),
            batch_size: 0,
            batch_timeout_secs: 5,
        }
    }

    #[test]
    fn test_resolve_batch_size() {
        assert_eq!(resolve_batch_size(10), 10);
        assert_eq!(resolve_batch_size(1), 1);
        assert_eq!(resolve_batch_size(0), 1);
        assert_eq!(resolve_batch_size(-5), 1);
    }

    #[test]
    fn test_build_run_config() {
        let config = build_run_config(&worker_args());

        assert_eq!(config.scenario_name(), "WorkerPool_3");
        assert_eq!(config.batch_size(), 1);
        assert_eq!(config.batch_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_worker_count_defaults_to_cpu_count() {
        let args = WorkerArgs {
            workers: None,
            ..worker_args()
        };
        assert_eq!(build_run_config(&args).worker_count(), num_cpus::get().max(1));
    }

    #[test]
    fn test_build_storage_config() {
        let storage = build_storage_config(&worker_args());
        assert_eq!(storage.source_path("a.png"), std::path::Path::new("up/a.png"));
        assert_eq!(
            storage.output_path("task-1", "webp"),
            std::path::Path::new("out/task-1.webp")
        );
    }
}
