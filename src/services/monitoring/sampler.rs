// ResourceSampler - 実行中のピークメモリを並行して監視

use crate::core::{BenchError, BenchResult, ProcessMetrics};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

/// 既定のサンプリング間隔
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// 一定間隔でRSSを読み、最大値を記録するサンプラー
pub struct ResourceSampler<M> {
    metrics: Arc<M>,
    interval: Duration,
}

impl<M> ResourceSampler<M>
where
    M: ProcessMetrics + 'static,
{
    pub fn new(metrics: Arc<M>) -> Self {
        Self {
            metrics,
            interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// サンプリングループを起動
    ///
    /// 最初のtickは即時に発火するため、起動直後の値も観測される。
    pub fn start(&self) -> SamplerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let metrics = Arc::clone(&self.metrics);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let join = tokio::spawn(async move {
            let mut peak: Option<u64> = None;
            let mut samples = 0usize;
            let mut record = |reading: Option<u64>| {
                // 読み取り失敗は無視
                if let Some(rss) = reading {
                    samples += 1;
                    if peak.map_or(true, |current| rss > current) {
                        peak = Some(rss);
                    }
                }
            };
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        // 停止時に最後の1回を読む
                        record(metrics.resident_memory_bytes());
                        break;
                    }
                    _ = ticker.tick() => record(metrics.resident_memory_bytes()),
                }
            }
            trace!(samples, peak = ?peak, "サンプリング終了");
            peak
        });

        SamplerHandle { stop_tx, join }
    }
}

/// 実行中のサンプラーへのハンドル
pub struct SamplerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<Option<u64>>,
}

impl SamplerHandle {
    /// ループを停止し、終了を待ってからピーク値を受け取る
    ///
    /// ループ側の最後の書き込みはjoinで受け渡されるため、停止後に
    /// 値が更新されることはない。
    pub async fn stop(self) -> BenchResult<Option<u64>> {
        // 受信側が既に終了していても結果はjoinで回収できる
        let _ = self.stop_tx.send(());
        self.join.await.map_err(BenchError::from)
    }
}
