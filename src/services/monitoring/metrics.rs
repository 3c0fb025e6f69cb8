// プロセス計測値の具象実装
// RSSは /proc/<pid>/status、CPU時間は getrusage(2) から取得する

use crate::core::ProcessMetrics;
use std::time::Duration;

/// OSから自プロセスの計測値を読む実装
#[derive(Debug, Clone)]
pub struct OsProcessMetrics {
    pid: u32,
}

impl Default for OsProcessMetrics {
    fn default() -> Self {
        Self::current()
    }
}

impl OsProcessMetrics {
    /// 自プロセスを対象にする
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
        }
    }
}

/// `/proc/<pid>/status` の `VmRSS:` 行をバイト数に変換
pub fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

impl ProcessMetrics for OsProcessMetrics {
    #[cfg(target_os = "linux")]
    fn resident_memory_bytes(&self) -> Option<u64> {
        let status = std::fs::read_to_string(format!("/proc/{}/status", self.pid)).ok()?;
        parse_vm_rss(&status)
    }

    #[cfg(not(target_os = "linux"))]
    fn resident_memory_bytes(&self) -> Option<u64> {
        None
    }

    #[cfg(unix)]
    fn cpu_time(&self) -> Option<Duration> {
        use nix::sys::resource::{getrusage, UsageWho};
        use nix::sys::time::TimeVal;

        // getrusageは自プロセスのみ対象
        if self.pid != std::process::id() {
            return None;
        }
        let usage = getrusage(UsageWho::RUSAGE_SELF).ok()?;
        let to_duration = |tv: TimeVal| {
            Duration::from_secs(tv.tv_sec().max(0) as u64)
                + Duration::from_micros(tv.tv_usec().max(0) as u64)
        };
        Some(to_duration(usage.user_time()) + to_duration(usage.system_time()))
    }

    #[cfg(not(unix))]
    fn cpu_time(&self) -> Option<Duration> {
        None
    }
}
