// 統合テスト用の共通ヘルパー

#![allow(dead_code)]

use compress_bench::{StorageConfig, TaskItem, TaskQueue};
use image::{ImageBuffer, Rgb};
use std::path::Path;
use tempfile::TempDir;

/// 一時ディレクトリ上のアップロード・出力・結果ファイル一式
pub struct TestStorage {
    pub temp_dir: TempDir,
    pub storage: StorageConfig,
}

impl TestStorage {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let storage = StorageConfig::new(
            root.join("uploads"),
            root.join("compressed"),
            root.join("results").join("results.csv"),
        );
        std::fs::create_dir_all(&storage.upload_dir).unwrap();
        storage.ensure_output_dirs().unwrap();
        Self { temp_dir, storage }
    }

    pub fn queue_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("queue")
    }

    /// グラデーションのPNGを `count` 枚作成し、ファイル名を返す
    pub fn write_images(&self, count: usize) -> Vec<String> {
        (1..=count)
            .map(|i| {
                let name = format!("image_{i:03}.png");
                write_png(&self.storage.upload_dir.join(&name), 32, 24, i as u8);
                name
            })
            .collect()
    }

    pub fn compressed_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.storage.compressed_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn result_lines(&self) -> Vec<String> {
        std::fs::read_to_string(&self.storage.result_path)
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

pub fn write_png(path: &Path, width: u32, height: u32, seed: u8) {
    let image = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x as u8).wrapping_mul(7).wrapping_add(seed),
            (y as u8).wrapping_mul(11),
            seed,
        ])
    });
    image.save(path).unwrap();
}

/// `task-{i}` の連番でタスクを発行
pub async fn publish_tasks<Q: TaskQueue + ?Sized>(queue: &Q, files: &[String]) {
    for (index, file_name) in files.iter().enumerate() {
        queue
            .publish(&TaskItem::new(format!("task-{}", index + 1), file_name.clone()))
            .await
            .unwrap();
    }
}
