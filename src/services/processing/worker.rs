// Worker - 単一タスクの圧縮処理

use crate::core::{BenchError, BenchResult, ItemProcessor, TaskItem};
use crate::services::codec::{ImageCodec, DEFAULT_QUALITY};
use crate::services::config::StorageConfig;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

/// 1タスク = 1画像の読み込みと再圧縮
pub struct CompressionProcessor<C> {
    codec: C,
    storage: StorageConfig,
    quality: u8,
}

impl<C: ImageCodec> CompressionProcessor<C> {
    pub fn new(codec: C, storage: StorageConfig) -> Self {
        Self {
            codec,
            storage,
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// 単一タスクの圧縮。失敗はエラーとして返す
    pub fn compress(&self, item: &TaskItem) -> BenchResult<PathBuf> {
        let src = self.storage.source_path(&item.file_name);
        let dst = self
            .storage
            .output_path(&item.id, self.codec.output_extension());

        let image = self
            .codec
            .load(&src)
            .map_err(|e| BenchError::codec(item.file_name.clone(), e))?;

        // imageはこのスコープを抜けると解放される
        self.codec
            .save(&image, &dst, self.quality)
            .map_err(|e| BenchError::codec(dst.display().to_string(), e))?;

        Ok(dst)
    }
}

impl<C: ImageCodec> ItemProcessor for CompressionProcessor<C> {
    fn process(&self, item: &TaskItem) {
        let start_time = Instant::now();
        match self.compress(item) {
            Ok(dst) => debug!(
                task_id = %item.id,
                output = %dst.display(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "画像を圧縮しました"
            ),
            Err(error) => warn!(task_id = %item.id, file = %item.file_name, %error, "画像処理に失敗しました"),
        }
    }

    fn release_caches(&self) {
        self.codec.clear_cache();
    }
}
