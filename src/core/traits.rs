// 計測システムのトレイト定義
// 戦略・計測・結果出力の境界となる抽象化インターフェース

use super::error::BenchResult;
use super::types::{ExperimentResult, TaskItem};
use mockall::automock;
use std::time::Duration;

/// 1アイテムを処理する関数の抽象化
///
/// 失敗は実装側でログに記録して吸収し、呼び出し元へは伝播しない。
#[automock]
pub trait ItemProcessor: Send + Sync {
    /// 1アイテムを処理
    fn process(&self, item: &TaskItem);

    /// 計測前にキャッシュ類を解放（デフォルトは何もしない）
    fn release_caches(&self) {}
}

/// プロセス計測値の取得元
#[automock]
pub trait ProcessMetrics: Send + Sync {
    /// 常駐メモリ(RSS)のバイト数。読み取り失敗時は `None`
    fn resident_memory_bytes(&self) -> Option<u64>;

    /// プロセスの累積CPU時間（user + system）。取得不能なら `None`
    fn cpu_time(&self) -> Option<Duration>;
}

/// 計測結果の出力先
#[automock]
pub trait ResultSink: Send + Sync {
    /// 1件追記
    fn append(&self, result: &ExperimentResult) -> BenchResult<()>;
}

// ItemProcessor for Box<dyn ItemProcessor>
impl ItemProcessor for Box<dyn ItemProcessor> {
    fn process(&self, item: &TaskItem) {
        self.as_ref().process(item)
    }

    fn release_caches(&self) {
        self.as_ref().release_caches()
    }
}

// ResultSink for Box<dyn ResultSink>
impl ResultSink for Box<dyn ResultSink> {
    fn append(&self, result: &ExperimentResult) -> BenchResult<()> {
        self.as_ref().append(result)
    }
}
