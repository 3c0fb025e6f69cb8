// 計測機能
// プロセスのCPU時間・常駐メモリの取得と、ピークメモリの並行監視

pub mod metrics;
pub mod sampler;

// 公開API
pub use metrics::OsProcessMetrics;
pub use sampler::{ResourceSampler, SamplerHandle, DEFAULT_SAMPLE_INTERVAL};
