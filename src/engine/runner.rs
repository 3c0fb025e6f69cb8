// ExperimentRunner - 1バッチ分の実行を計測し結果を組み立てる

use super::strategy::ExecutionStrategy;
use crate::core::{BenchResult, ExperimentResult, ItemProcessor, ProcessMetrics, TaskItem};
use crate::services::config::RunConfig;
use crate::services::monitoring::{ResourceSampler, DEFAULT_SAMPLE_INTERVAL};
use chrono::Local;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 消費CPU時間と経過時間からCPU使用率(%)を算出
///
/// 経過時間が0なら0。複数コアを使った場合は100を超えうる。
pub fn cpu_percent(cpu_start: Duration, cpu_end: Duration, wall: Duration) -> f64 {
    let wall_secs = wall.as_secs_f64();
    if wall_secs <= 0.0 {
        return 0.0;
    }
    let used = cpu_end.saturating_sub(cpu_start).as_secs_f64();
    used / wall_secs * 100.0
}

/// 計測付きでバッチを実行するランナー
pub struct ExperimentRunner<M> {
    config: RunConfig,
    metrics: Arc<M>,
    sample_interval: Duration,
}

impl<M> ExperimentRunner<M>
where
    M: ProcessMetrics + 'static,
{
    pub fn new(config: RunConfig, metrics: Arc<M>) -> Self {
        Self {
            config,
            metrics,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// バッチを実行して計測結果を返す
    ///
    /// 計測値が取れない場合は `None` として扱い、実行自体は失敗させない。
    /// 戦略が失敗した場合はサンプラーを停止してからエラーを返す。
    pub async fn run(
        &self,
        items: Vec<TaskItem>,
        strategy: &dyn ExecutionStrategy,
        processor: Arc<dyn ItemProcessor>,
    ) -> BenchResult<ExperimentResult> {
        let item_count = items.len();
        let scenario_name = self.config.scenario_name();

        processor.release_caches();

        info!(
            scenario = %scenario_name,
            strategy = strategy.kind(),
            item_count,
            "バッチ処理を開始します"
        );

        let started = Instant::now();
        let cpu_start = self.metrics.cpu_time();
        let sampler = ResourceSampler::new(Arc::clone(&self.metrics))
            .with_interval(self.sample_interval)
            .start();

        let executed = strategy.execute(items, processor).await;

        let peak_memory_bytes = sampler.stop().await.unwrap_or_else(|error| {
            warn!(%error, "メモリサンプラーの停止に失敗しました");
            None
        });
        let wall = started.elapsed();
        let cpu_end = self.metrics.cpu_time();

        executed?;

        let cpu_percent = match (cpu_start, cpu_end) {
            (Some(start), Some(end)) => Some(cpu_percent(start, end, wall)),
            _ => {
                warn!("CPU時間を取得できませんでした");
                None
            }
        };

        let result = ExperimentResult {
            timestamp: Local::now(),
            scenario_name,
            item_count,
            duration_seconds: wall.as_secs_f64(),
            cpu_percent,
            peak_memory_bytes,
            worker_count: self.config.worker_count(),
        };

        info!(
            scenario = %result.scenario_name,
            item_count,
            duration_secs = result.duration_seconds,
            cpu_percent = ?result.cpu_percent,
            peak_memory_mb = ?result.peak_memory_mb(),
            "バッチ完了"
        );

        Ok(result)
    }
}
