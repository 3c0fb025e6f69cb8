use crate::cli::args::SeedArgs;
use crate::core::{BenchError, TaskItem};
use crate::queue::{SpoolQueue, TaskQueue};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// アップロードディレクトリ直下の対象ファイル名を名前順で列挙
///
/// ディレクトリ・隠しファイル・4バイト以下の名前は対象外。
pub fn list_upload_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry
            .with_context(|| format!("Failed to read upload directory: {}", dir.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.len() > 4 && !name.starts_with('.') {
            files.push(name.into_owned());
        }
    }
    Ok(files)
}

/// 先頭から最大 `count` 件をタスクとして発行し、発行できた件数を返す
///
/// 発行に失敗したファイルはログに残して次へ進む。
pub async fn seed_tasks<Q>(queue: &Q, files: &[String], count: usize) -> usize
where
    Q: TaskQueue + ?Sized,
{
    let limit = if count > files.len() {
        warn!(
            requested = count,
            available = files.len(),
            "要求数より画像が少ないため、全件を投入します"
        );
        files.len()
    } else {
        count
    };

    let mut published = 0;
    for (index, file_name) in files.iter().take(limit).enumerate() {
        let item = TaskItem::new(format!("task-{}", index + 1), file_name.clone());
        match queue.publish(&item).await {
            Ok(()) => published += 1,
            Err(error) => warn!(file = %file_name, error = %error, "タスクの発行に失敗しました"),
        }
    }
    published
}

/// `seed` サブコマンド
pub async fn execute_seed(args: SeedArgs) -> Result<()> {
    let upload_dir = &args.storage.upload_dir;

    let queue = SpoolQueue::open(&args.storage.queue_dir)
        .await
        .map_err(|e| BenchError::queue_connection(format!("{e:#}")))?;

    let files = list_upload_files(upload_dir)?;
    if files.is_empty() {
        warn!(
            upload_dir = %upload_dir.display(),
            "画像が見つかりません。データセットを配置してください"
        );
        return Ok(());
    }

    let published = seed_tasks(&queue, &files, args.count).await;
    info!(published, queue_dir = %queue.dir().display(), "タスクを投入しました");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{MemoryQueue, MockTaskQueue};
    use std::fs;
    use tempfile::TempDir;

    fn upload_dir_with(names: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for name in names {
            fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_list_upload_files_filters_and_sorts() {
        let temp_dir = upload_dir_with(&["b.png", "a.jpg", ".hidden.png", "x.gi", "abcd"]);
        fs::create_dir(temp_dir.path().join("nested.dir")).unwrap();
        fs::write(temp_dir.path().join("nested.dir").join("deep.png"), b"x").unwrap();

        let files = list_upload_files(temp_dir.path()).unwrap();

        assert_eq!(files, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn test_list_upload_files_counts_name_length_in_bytes() {
        // "猫.p" は3文字だが5バイト
        let temp_dir = upload_dir_with(&["猫.p", "ab.c"]);

        let files = list_upload_files(temp_dir.path()).unwrap();

        assert_eq!(files, vec!["猫.p"]);
    }

    #[test]
    fn test_list_upload_files_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_upload_files(&temp_dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_seed_tasks_numbers_from_one() {
        let queue = MemoryQueue::new();
        let files = vec!["a.jpg".to_string(), "b.png".to_string(), "c.png".to_string()];

        let published = seed_tasks(&queue, &files, 2).await;
        assert_eq!(published, 2);

        let mut rx = queue.consume().await.unwrap();
        let first = TaskItem::decode(&rx.recv().await.unwrap().body).unwrap();
        let second = TaskItem::decode(&rx.recv().await.unwrap().body).unwrap();
        assert_eq!(first, TaskItem::new("task-1", "a.jpg"));
        assert_eq!(second, TaskItem::new("task-2", "b.png"));
        assert_eq!(queue.unacked_count(), 2);
    }

    #[tokio::test]
    async fn test_seed_tasks_caps_at_available_files() {
        let queue = MemoryQueue::new();
        let files = vec!["a.jpg".to_string(), "b.png".to_string()];

        assert_eq!(seed_tasks(&queue, &files, 100).await, 2);
        assert_eq!(queue.backlog_count(), 2);
    }

    #[tokio::test]
    async fn test_seed_tasks_continues_after_publish_failure() {
        let mut mock_queue = MockTaskQueue::new();
        mock_queue
            .expect_publish()
            .times(3)
            .returning(|item: &TaskItem| {
                if item.id == "task-2" {
                    Err(anyhow::anyhow!("spool full"))
                } else {
                    Ok(())
                }
            });
        let files: Vec<String> = ["a.jpg", "b.png", "c.png"].iter().map(|s| s.to_string()).collect();

        assert_eq!(seed_tasks(&mock_queue, &files, 3).await, 2);
    }
}
