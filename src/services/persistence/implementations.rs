// 計測結果の永続化の具象実装

use crate::core::{BenchError, BenchResult, ExperimentResult, ResultSink};
use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// CSVのヘッダー（7列固定）
pub const CSV_HEADER: [&str; 7] = [
    "Timestamp",
    "Scenario",
    "Total_Images",
    "Duration_Sec",
    "CPU_Avg_Percent",
    "Peak_RAM_MB",
    "Num_Workers",
];

/// 結果1件をCSVの1行に整形（改行なし）
///
/// 計測不能な値は空欄として出力する。
pub fn format_csv_row(result: &ExperimentResult) -> String {
    let cpu = result
        .cpu_percent
        .map(|cpu| format!("{cpu:.2}"))
        .unwrap_or_default();
    let ram = result
        .peak_memory_mb()
        .map(|mb| format!("{mb:.2}"))
        .unwrap_or_default();

    [
        result.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        result.scenario_name.clone(),
        result.item_count.to_string(),
        format!("{:.4}", result.duration_seconds),
        cpu,
        ram,
        result.worker_count.to_string(),
    ]
    .join(",")
}

/// 追記専用のCSVファイル出力
#[derive(Debug)]
pub struct CsvResultSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_row(&self, row: &str) -> anyhow::Result<()> {
        let is_new = !self.path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open result file: {}", self.path.display()))?;

        // ヘッダーはファイル新規作成時のみ
        let mut buffer = String::new();
        if is_new {
            buffer.push_str(&CSV_HEADER.join(","));
            buffer.push('\n');
        }
        buffer.push_str(row);
        buffer.push('\n');

        file.write_all(buffer.as_bytes())
            .with_context(|| format!("Failed to write result file: {}", self.path.display()))?;
        file.flush()?;
        Ok(())
    }
}

impl ResultSink for CsvResultSink {
    fn append(&self, result: &ExperimentResult) -> BenchResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| BenchError::persistence(anyhow::anyhow!("result file lock poisoned")))?;
        self.append_row(&format_csv_row(result))
            .map_err(BenchError::persistence)
    }
}

/// メモリ上に結果を保持する実装（テスト・ベンチマーク用）
#[derive(Debug, Default, Clone)]
pub struct MemoryResultSink {
    results: Arc<Mutex<Vec<ExperimentResult>>>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みの結果を取得
    pub fn results(&self) -> BenchResult<Vec<ExperimentResult>> {
        self.results
            .lock()
            .map(|results| results.clone())
            .map_err(|_| BenchError::persistence(anyhow::anyhow!("memory sink lock poisoned")))
    }
}

impl ResultSink for MemoryResultSink {
    fn append(&self, result: &ExperimentResult) -> BenchResult<()> {
        self.results
            .lock()
            .map_err(|_| BenchError::persistence(anyhow::anyhow!("memory sink lock poisoned")))?
            .push(result.clone());
        Ok(())
    }
}
