// エンジン層 - バッチ集約と計測付き実行
// キューからの集約、実行戦略、計測を組み合わせる

pub mod aggregator;
pub mod api;
pub mod runner;
pub mod strategy;
pub mod work_queue;

pub use aggregator::BatchAggregator;
pub use api::process_next_batch;
pub use runner::{cpu_percent, ExperimentRunner};
pub use strategy::{select_strategy, ExecutionStrategy, NaiveConcurrent, Sequential, WorkerPool};
pub use work_queue::{WorkConsumer, WorkQueue};
