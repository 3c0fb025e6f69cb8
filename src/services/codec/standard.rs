use super::ImageCodec;
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageReader, Limits};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// imageクレートによる標準コーデック実装
///
/// 読み込みはimageクレート、書き出しはlibwebpによる非可逆WebP。
/// どちらも内部スレッドを持たない構成のため、処理は呼び出しスレッド上で完結する。
#[derive(Clone, Debug, Default)]
pub struct StandardCodec {
    max_alloc: Option<u64>,
}

impl StandardCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// デコード時の最大割り当て量を制限したコーデックを作成
    pub fn with_max_alloc(max_alloc: Option<u64>) -> Self {
        Self { max_alloc }
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        if let Some(max_alloc) = self.max_alloc {
            limits.max_alloc = Some(max_alloc);
        }
        limits
    }
}

impl ImageCodec for StandardCodec {
    fn load(&self, path: &Path) -> Result<DynamicImage> {
        let mut reader = ImageReader::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("Failed to detect image format: {}", path.display()))?;
        reader.limits(self.limits());

        reader
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))
    }

    fn save(&self, image: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
        let rgb = image.to_rgb8();
        let encoded = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
            .encode_simple(false, f32::from(quality))
            .map_err(|e| anyhow!("Failed to encode image: {}: {e:?}", path.display()))?;

        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&encoded)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;

        writer
            .flush()
            .with_context(|| format!("Failed to flush output file: {}", path.display()))
    }

    fn output_extension(&self) -> &'static str {
        "webp"
    }
}
