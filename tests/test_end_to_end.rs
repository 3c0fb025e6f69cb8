// エンドツーエンド統合テスト
// キュー投入から圧縮・計測・CSV追記・ackまでを通しで確認する

mod fixtures;

use compress_bench::cli::commands::{run_worker, seed_tasks};
use compress_bench::services::persistence::CSV_HEADER;
use compress_bench::{
    BatchOutcome, CodecSession, CodecSettings, DispatchTrigger, MemoryQueue, RunConfig, SpoolQueue,
};
use fixtures::{publish_tasks, TestStorage};
use std::sync::Arc;
use std::time::Duration;

fn pool_config(workers: usize, batch_size: usize) -> RunConfig {
    RunConfig::new()
        .with_concurrency(true)
        .with_worker_pool(true)
        .with_worker_count(workers)
        .with_batch_size(batch_size)
        .with_batch_timeout(Duration::from_secs(60))
}

fn fields(line: &str) -> Vec<&str> {
    line.split(',').collect()
}

#[tokio::test]
async fn test_worker_pool_batch_of_ten() {
    let env = TestStorage::new();
    let files = env.write_images(10);
    let queue = Arc::new(MemoryQueue::new());
    publish_tasks(queue.as_ref(), &files).await;
    let session = CodecSession::startup(CodecSettings::default()).unwrap();

    let outcome = run_worker(
        Arc::clone(&queue),
        pool_config(4, 10),
        env.storage.clone(),
        &session,
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        BatchOutcome::Dispatched {
            item_count: 10,
            trigger: DispatchTrigger::TargetReached
        }
    );
    assert_eq!(queue.acked_tags().len(), 10);
    assert_eq!(queue.unacked_count(), 0);

    let compressed = env.compressed_files();
    assert_eq!(compressed.len(), 10);
    assert!(compressed.contains(&"task-1.webp".to_string()));
    assert!(compressed.contains(&"task-10.webp".to_string()));

    let lines = env.result_lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], CSV_HEADER.join(","));

    let row = fields(&lines[1]);
    assert_eq!(row.len(), 7);
    assert_eq!(row[1], "WorkerPool_4");
    assert_eq!(row[2], "10");
    assert_eq!(row[6], "4");
}

#[tokio::test]
async fn test_failed_item_does_not_block_the_batch() {
    let env = TestStorage::new();
    let mut files = env.write_images(2);
    files.insert(1, "does_not_exist.png".to_string());
    let queue = Arc::new(MemoryQueue::new());
    publish_tasks(queue.as_ref(), &files).await;
    let session = CodecSession::startup(CodecSettings::default()).unwrap();

    let config = RunConfig::new()
        .with_concurrency(true)
        .with_worker_pool(false)
        .with_batch_size(3);
    let outcome = run_worker(Arc::clone(&queue), config, env.storage.clone(), &session)
        .await
        .unwrap();

    assert!(matches!(outcome, BatchOutcome::Dispatched { item_count: 3, .. }));
    // 処理に失敗したアイテムもバッチとしてはackされる
    assert_eq!(queue.acked_tags().len(), 3);
    assert_eq!(env.compressed_files(), vec!["task-1.webp", "task-3.webp"]);

    let lines = env.result_lines();
    assert_eq!(fields(&lines[1])[1], "Naive_Concurrent");
    assert_eq!(fields(&lines[1])[2], "3");
}

#[tokio::test]
async fn test_consecutive_runs_append_rows_under_one_header() {
    let env = TestStorage::new();
    let files = env.write_images(4);
    let queue = Arc::new(MemoryQueue::new());
    publish_tasks(queue.as_ref(), &files).await;
    let session = CodecSession::startup(CodecSettings::default()).unwrap();

    for _ in 0..2 {
        let config = RunConfig::new().with_batch_size(2);
        run_worker(Arc::clone(&queue), config, env.storage.clone(), &session)
            .await
            .unwrap();
    }

    let lines = env.result_lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert!(lines[1..].iter().all(|line| fields(line)[1] == "Sequential"));
    assert_eq!(queue.acked_tags().len(), 4);
    assert_eq!(env.compressed_files().len(), 4);
}

#[tokio::test]
async fn test_spool_queue_round_trip_through_seed_and_worker() {
    let env = TestStorage::new();
    let files = env.write_images(3);
    let queue = Arc::new(
        SpoolQueue::open(env.queue_dir())
            .await
            .unwrap()
            .with_poll_interval(Duration::from_millis(5)),
    );

    assert_eq!(seed_tasks(queue.as_ref(), &files, 3).await, 3);
    assert_eq!(queue.message_count().await.unwrap(), 3);

    let session = CodecSession::startup(CodecSettings::default()).unwrap();
    let outcome = run_worker(
        Arc::clone(&queue),
        pool_config(2, 3),
        env.storage.clone(),
        &session,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, BatchOutcome::Dispatched { item_count: 3, .. }));
    // ack済みメッセージはスプールから消える
    assert_eq!(queue.message_count().await.unwrap(), 0);
    assert_eq!(env.compressed_files().len(), 3);
    assert_eq!(fields(&env.result_lines()[1])[1], "WorkerPool_2");
}
