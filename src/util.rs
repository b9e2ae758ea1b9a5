use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::sync::walker::SyncStats;

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Per-file progress bar: a byte bar when the remote size is known, a
/// spinner with a running byte count otherwise.
pub fn file_progress_bar(size: Option<u64>, name: &str) -> ProgressBar {
    let pb = match size {
        Some(s) => {
            let pb = ProgressBar::new(s);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .expect("valid file template")
                .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg} {bytes}")
                    .expect("valid spinner template"),
            );
            pb
        }
    };
    pb.set_message(name.to_string());
    pb
}

/// Print a concise summary for a completed sync run.
pub fn print_summary(stats: &SyncStats, elapsed_secs: f64) {
    let rate = if elapsed_secs > 0.0 {
        stats.bytes_transferred as f64 / 1024.0 / 1024.0 / elapsed_secs
    } else {
        0.0
    };
    let transferred = format!(
        "传输 {} 个文件 ({})",
        stats.files_transferred,
        human_bytes(stats.bytes_transferred)
    );
    let skipped = format!(
        "跳过 {} (扩展名 {} / 过旧 {} / 未变化 {})",
        stats.skipped_extension + stats.skipped_stale + stats.skipped_unchanged,
        stats.skipped_extension,
        stats.skipped_stale,
        stats.skipped_unchanged
    );
    println!(
        "{} | {} | 目录 {} (未递归 {}) | 平均速率: {:.2} MB/s, 耗时 {:.2} 秒",
        transferred.green(),
        skipped,
        stats.dirs_visited,
        stats.dirs_skipped,
        rate,
        elapsed_secs
    );
    if stats.failures() > 0 {
        println!(
            "{}",
            format!(
                "⚠️ 失败 {} (列目录 {} / 传输 {})",
                stats.failures(),
                stats.listing_failures,
                stats.transfer_failures
            )
            .yellow()
        );
    }
}

/// Write structured failures as JSON Lines under the canonical logs
/// directory (or an explicit path) and return where they landed. Appends,
/// so repeated runs against the same explicit path keep history.
pub fn write_failures_jsonl(
    path: Option<PathBuf>,
    failures: &[crate::SyncError],
) -> Option<PathBuf> {
    if failures.is_empty() {
        return None;
    }
    let p = path.unwrap_or_else(|| {
        crate::config::Config::logs_dir()
            .join(format!("failures_{}.jsonl", Utc::now().format("%Y%m%dT%H%M%SZ")))
    });
    if let Some(parent) = p.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let mut f = std::fs::OpenOptions::new().create(true).append(true).open(&p).ok()?;
    for err in failures {
        let obj = serde_json::json!({
            "variant": err.variant(),
            "message": err.to_string(),
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(f, "{}", line);
        }
    }
    Some(p)
}

/// Initialize tracing for a sync run. `--verbose` writes debug-level logs
/// to a daily file under the logs dir (keep the returned guard alive until
/// exit); otherwise info-level logs go to stderr. Returns `None` when a
/// subscriber is already installed (tests).
pub fn init_logging(verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    if verbose {
        let dir = crate::config::Config::logs_dir();
        let _ = std::fs::create_dir_all(&dir);
        let appender = tracing_appender::rolling::daily(&dir, "fm.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let res = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .try_init();
        if res.is_ok() { Some(guard) } else { None }
    } else {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MiB");
        assert_eq!(human_bytes(5 * 1024 * 1024 * 1024), "5.00 GiB");
    }

    #[test]
    fn failures_jsonl_roundtrip() {
        let mut base = std::env::temp_dir();
        base.push(format!(
            "fm_util_test_{}_{}",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        ));
        std::fs::create_dir(&base).expect("create tmp dir");
        let path = base.join("failures.jsonl");
        let failures = vec![
            crate::SyncError::TransferFailed("a.txt".into(), "drop".into()),
            crate::SyncError::ListDirFailed("/sub".into(), "451".into()),
        ];
        let written = write_failures_jsonl(Some(path.clone()), &failures).expect("written");
        assert_eq!(written, path);
        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(v["variant"], "TransferFailed");
        // empty failure list writes nothing
        assert!(write_failures_jsonl(Some(base.join("none.jsonl")), &[]).is_none());
        assert!(!base.join("none.jsonl").exists());
        let _ = std::fs::remove_dir_all(&base);
    }
}
