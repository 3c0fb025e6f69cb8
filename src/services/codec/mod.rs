use anyhow::Result;
use image::DynamicImage;
use mockall::automock;
use std::path::Path;
use tracing::info;

pub mod standard;

/// 圧縮時の既定品質
pub const DEFAULT_QUALITY: u8 = 75;

/// 画像コーデックのトレイト
///
/// 読み込んだ画像バッファは所有権で管理され、成功・失敗どちらの経路でも
/// スコープを抜けた時点で解放される。
#[automock]
pub trait ImageCodec: Send + Sync {
    /// ファイルパスから画像を読み込む
    fn load(&self, path: &Path) -> Result<DynamicImage>;

    /// 指定品質で画像を書き出す
    fn save(&self, image: &DynamicImage, path: &Path, quality: u8) -> Result<()>;

    /// 出力ファイルの拡張子
    fn output_extension(&self) -> &'static str;

    /// 内部キャッシュを解放（デフォルトは何もしない）
    fn clear_cache(&self) {}
}

/// コーデックエンジンの設定
#[derive(Debug, Clone, PartialEq)]
pub struct CodecSettings {
    /// 出力品質 (1-100)
    pub quality: u8,
    /// デコード時の最大メモリ割り当て（バイト）
    pub max_alloc: Option<u64>,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_alloc: None,
        }
    }
}

/// プロセス全体で1度だけ起動・停止するコーデックエンジン
///
/// 画像単位のバッファとは独立したスコープで、`main` の先頭で取得し
/// プロセス終了時に破棄する。エンジン自体は内部並列を持たない構成でビルドされる。
#[derive(Debug)]
pub struct CodecSession {
    settings: CodecSettings,
}

impl CodecSession {
    pub fn startup(settings: CodecSettings) -> crate::core::BenchResult<Self> {
        if !(1..=100).contains(&settings.quality) {
            return Err(crate::core::BenchError::configuration(format!(
                "品質は1から100の範囲で指定してください: {}",
                settings.quality
            )));
        }
        info!(
            quality = settings.quality,
            max_alloc = ?settings.max_alloc,
            "コーデックエンジン起動（内部並列なし）"
        );
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }

    /// このセッション設定でコーデックを作成
    pub fn codec(&self) -> standard::StandardCodec {
        standard::StandardCodec::with_max_alloc(self.settings.max_alloc)
    }
}

impl Drop for CodecSession {
    fn drop(&mut self) {
        info!("コーデックエンジン停止");
    }
}
