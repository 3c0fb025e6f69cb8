pub mod cli;
pub mod core;
pub mod engine;
pub mod queue;
pub mod services;

pub use crate::core::{
    BatchOutcome, BenchError, BenchResult, DispatchTrigger, ExperimentResult, ItemProcessor,
    ProcessMetrics, ResultSink, TaskItem,
};
pub use engine::{
    process_next_batch, select_strategy, BatchAggregator, ExecutionStrategy, ExperimentRunner,
    NaiveConcurrent, Sequential, WorkerPool,
};
pub use queue::{Delivery, MemoryQueue, SpoolQueue, TaskQueue};
pub use services::{
    CodecSession, CodecSettings, CompressionProcessor, CsvResultSink, MemoryResultSink,
    OsProcessMetrics, RunConfig, StandardCodec, StorageConfig,
};
