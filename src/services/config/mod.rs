// 設定管理機能
// 実行設定・ファイル配置・シナリオ名

pub mod implementations;

// 公開API
pub use implementations::{scenario_name, RunConfig, StorageConfig};
