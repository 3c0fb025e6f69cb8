// CLI層 - コマンドライン引数の定義と処理
// 環境変数と引数から設定を組み立て、各コマンドへ橋渡しする

pub mod args;
pub mod commands;

// 公開API
pub use args::*;
pub use commands::*;
