use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compress_bench")]
#[command(about = "Benchmark image compression strategies fed from a task queue")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Consume one batch from the queue, compress it and append the measurement
    Worker(WorkerArgs),

    /// Publish one task per upload file to the queue
    Seed(SeedArgs),
}

/// Paths shared by both subcommands
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Directory holding the source images
    #[arg(long, env = "STORAGE_PATH_UPLOAD", default_value = "storage/uploads")]
    pub upload_dir: PathBuf,

    /// Queue spool directory
    #[arg(long, env = "QUEUE_PATH", default_value = "storage/queue")]
    pub queue_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Directory for compressed output
    #[arg(long, env = "STORAGE_PATH_COMPRESSED", default_value = "storage/compressed")]
    pub compressed_dir: PathBuf,

    /// CSV file the measurement row is appended to
    #[arg(long, env = "RESULT_FILE_PATH", default_value = "results.csv")]
    pub result_file: PathBuf,

    /// Process the batch concurrently
    #[arg(
        long,
        env = "IS_CONCURRENT",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        default_value = "false"
    )]
    pub concurrent: bool,

    /// Use the fixed-size worker pool instead of one task per item
    #[arg(
        long,
        env = "USE_WORKER_POOL",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        default_value = "false"
    )]
    pub worker_pool: bool,

    /// Number of pool workers (defaults to the CPU count)
    #[arg(long, env = "NUM_WORKERS")]
    pub workers: Option<usize>,

    /// Items per batch; values of 0 or below fall back to 1
    #[arg(long, env = "BATCH_SIZE", default_value = "1", allow_negative_numbers = true)]
    pub batch_size: i64,

    /// Seconds to wait for a full batch before dispatching what has arrived
    #[arg(long, env = "BATCH_TIMEOUT_SECS", default_value = "60")]
    pub batch_timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Number of tasks to publish
    #[arg(short, long, default_value = "100")]
    pub count: usize,
}
