// ベンチマーク全体で共有するエラー型定義
// セットアップ失敗・キュー・コーデック・ハンドラ失敗を分類する

use thiserror::Error;

/// ベンチマーク固有のエラー型
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("キュー接続エラー: {message}")]
    QueueConnectionError { message: String },

    #[error("キュー操作エラー: {operation} - {source}")]
    QueueOperationError {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("メッセージデコードエラー: {source}")]
    MessageDecodeError {
        #[source]
        source: serde_json::Error,
    },

    #[error("画像処理エラー: {file_path} - {source}")]
    CodecError {
        file_path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("並列実行エラー: {message}")]
    ExecutionError { message: String },

    #[error("タスクエラー: {source}")]
    TaskError {
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("永続化エラー: {source}")]
    PersistenceError {
        #[source]
        source: anyhow::Error,
    },

    #[error("設定エラー: {message}")]
    ConfigurationError { message: String },

    #[error("内部エラー: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl BenchError {
    pub fn queue_connection(message: impl Into<String>) -> Self {
        Self::QueueConnectionError {
            message: message.into(),
        }
    }

    pub fn queue_operation(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::QueueOperationError {
            operation: operation.into(),
            source,
        }
    }

    pub fn codec(file_path: impl Into<String>, source: anyhow::Error) -> Self {
        Self::CodecError {
            file_path: file_path.into(),
            source,
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError {
            message: message.into(),
        }
    }

    pub fn persistence(source: anyhow::Error) -> Self {
        Self::PersistenceError { source }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}

/// ベンチマークの結果型
pub type BenchResult<T> = std::result::Result<T, BenchError>;

impl From<anyhow::Error> for BenchError {
    fn from(error: anyhow::Error) -> Self {
        BenchError::InternalError { source: error }
    }
}

impl From<tokio::task::JoinError> for BenchError {
    fn from(error: tokio::task::JoinError) -> Self {
        BenchError::TaskError { source: error }
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(error: serde_json::Error) -> Self {
        BenchError::MessageDecodeError { source: error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_bench_error_creation() {
        let queue_error = BenchError::queue_connection("spool directory missing");
        assert!(queue_error.to_string().contains("キュー接続エラー"));
        assert!(queue_error.to_string().contains("spool directory missing"));

        let codec_error = BenchError::codec("/uploads/a.png", anyhow::anyhow!("破損しています"));
        assert!(codec_error.to_string().contains("画像処理エラー"));
        assert!(codec_error.to_string().contains("/uploads/a.png"));

        let config_error = BenchError::configuration("ワーカー数は1以上である必要があります");
        assert!(config_error.to_string().contains("設定エラー"));
    }

    #[test]
    fn test_error_source_chain() {
        let error = BenchError::persistence(anyhow::anyhow!("disk full"));
        assert!(error.source().is_some());

        let decode = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: BenchError = decode.into();
        assert!(matches!(error, BenchError::MessageDecodeError { .. }));
        assert!(error.source().is_some());
    }

    #[tokio::test]
    async fn test_task_error_from_join_error() {
        let task = tokio::spawn(async {
            std::future::pending::<()>().await;
        });
        task.abort();

        let join_error = task.await.expect_err("タスクエラーが期待されます");
        let error: BenchError = join_error.into();

        assert!(error.to_string().contains("タスクエラー"));
        assert!(matches!(error, BenchError::TaskError { .. }));
    }

    #[test]
    fn test_anyhow_error_becomes_internal() {
        let error: BenchError = anyhow::anyhow!("予期しない状態").into();
        assert!(matches!(error, BenchError::InternalError { .. }));
        assert!(error.to_string().contains("内部エラー"));
    }
}
