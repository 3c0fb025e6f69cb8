// 永続化機能
// 計測結果の追記専用出力

pub mod implementations;

// 公開API
pub use implementations::{format_csv_row, CsvResultSink, MemoryResultSink, CSV_HEADER};
