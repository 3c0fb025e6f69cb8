// 画像処理機能
// 単一タスクの圧縮（失敗はタスク内で吸収）

pub mod worker;

// 公開API
pub use worker::CompressionProcessor;
