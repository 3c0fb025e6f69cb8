// 実行設定の具象実装

use crate::core::{BenchError, BenchResult};
use std::path::PathBuf;
use std::time::Duration;

/// シナリオ名を決定（結果行のメタデータ専用で動作には影響しない）
pub fn scenario_name(is_concurrent: bool, use_pool: bool, worker_count: usize) -> String {
    if !is_concurrent {
        return "Sequential".to_string();
    }
    if use_pool {
        return format!("WorkerPool_{worker_count}");
    }
    "Naive_Concurrent".to_string()
}

/// 1回の実行を通して読み取り専用の設定
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    is_concurrent: bool,
    use_pool: bool,
    worker_count: usize,
    batch_size: usize,
    batch_timeout: Duration,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, enabled: bool) -> Self {
        self.is_concurrent = enabled;
        self
    }

    pub fn with_worker_pool(mut self, enabled: bool) -> Self {
        self.use_pool = enabled;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }

    pub fn is_concurrent(&self) -> bool {
        self.is_concurrent
    }

    pub fn use_pool(&self) -> bool {
        self.use_pool
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batch_timeout(&self) -> Duration {
        self.batch_timeout
    }

    pub fn scenario_name(&self) -> String {
        scenario_name(self.is_concurrent, self.use_pool, self.worker_count)
    }

    /// 設定の整合性を検証
    pub fn validate(&self) -> BenchResult<()> {
        if self.batch_size == 0 {
            return Err(BenchError::configuration(
                "バッチサイズは1以上である必要があります",
            ));
        }
        if self.is_concurrent && self.use_pool && self.worker_count == 0 {
            return Err(BenchError::configuration(
                "ワーカープールのワーカー数は1以上である必要があります",
            ));
        }
        if self.batch_timeout.is_zero() {
            return Err(BenchError::configuration(
                "バッチタイムアウトは0より大きい必要があります",
            ));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            is_concurrent: false,
            use_pool: false,
            worker_count: num_cpus::get().max(1),
            batch_size: 1,
            batch_timeout: Duration::from_secs(60),
        }
    }
}

/// 入出力ファイルの配置
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub compressed_dir: PathBuf,
    pub result_path: PathBuf,
}

impl StorageConfig {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        compressed_dir: impl Into<PathBuf>,
        result_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            compressed_dir: compressed_dir.into(),
            result_path: result_path.into(),
        }
    }

    /// 元画像のパス
    pub fn source_path(&self, file_name: &str) -> PathBuf {
        self.upload_dir.join(file_name)
    }

    /// 圧縮後の出力パス
    pub fn output_path(&self, task_id: &str, extension: &str) -> PathBuf {
        self.compressed_dir.join(format!("{task_id}.{extension}"))
    }

    /// 出力先ディレクトリを用意
    pub fn ensure_output_dirs(&self) -> BenchResult<()> {
        std::fs::create_dir_all(&self.compressed_dir).map_err(|e| {
            BenchError::configuration(format!(
                "出力ディレクトリを作成できません: {} ({e})",
                self.compressed_dir.display()
            ))
        })?;
        if let Some(parent) = self.result_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BenchError::configuration(format!(
                    "結果ファイルのディレクトリを作成できません: {} ({e})",
                    parent.display()
                ))
            })?;
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new("storage/uploads", "storage/compressed", "results.csv")
    }
}
