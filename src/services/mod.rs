// サービス層 - 機能別のビジネスロジック
// 各サービスは特定の責任を持ち、疎結合で設計されている

pub mod codec;
pub mod config;
pub mod monitoring;
pub mod persistence;
pub mod processing;

// 公開API - 各サービスの主要機能を明示的にエクスポート
pub use codec::{standard::StandardCodec, CodecSession, CodecSettings, ImageCodec};
pub use config::{scenario_name, RunConfig, StorageConfig};
pub use monitoring::{OsProcessMetrics, ResourceSampler, SamplerHandle};
pub use persistence::{CsvResultSink, MemoryResultSink};
pub use processing::CompressionProcessor;
