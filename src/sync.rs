// sync module: selective recursive pull-sync orchestration and helpers
pub mod executor;
pub mod filter;
pub mod ftp_like;
pub mod listing;
pub mod mock_ftp;
pub mod session;
pub mod walker;

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::unbounded;

use crate::config::Config;
use self::walker::{SyncStats, TreeWalker, WalkOptions};

/// Arguments for `handle_sync` grouped to avoid too-many-arguments lint.
/// Each field overrides (or enables on top of) the stored configuration
/// for this run only.
#[derive(Clone)]
pub struct HandleSyncArgs {
    pub remote_root: Option<String>,
    pub local_root: Option<String>,
    pub recursive: bool,
    pub recent_hours: Option<u64>,
    pub extensions: Vec<String>,
    pub skip_unchanged: bool,
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

/// 同步子命令主入口：打开单一 FTP 会话，递归镜像远端目录树到本地。
///
/// 概览:
/// - 会话生命周期：连接/认证/被动模式/进入远端根目录；任何一步失败都是
///   致命错误；无论走到哪条路径，收尾时都会关闭会话。
/// - 过滤链：扩展名允许列表 → 近期窗口 → 跳过未变化（按大小比对）。
/// - 失败处理：单个文件或子目录失败仅记录并继续；失败清单会写入配置
///   目录下的 `logs/`。
pub fn handle_sync(config: &Config, args: HandleSyncArgs) -> Result<()> {
    let HandleSyncArgs {
        remote_root,
        local_root,
        recursive,
        recent_hours,
        extensions,
        skip_unchanged,
        json,
        quiet,
        verbose: _,
    } = args;

    // 解析本次运行的有效配置 — resolve the effective per-run configuration
    let mut cfg = config.clone();
    if let Some(r) = remote_root {
        cfg.remote_root = r;
    }
    if let Some(l) = local_root {
        cfg.local_root = l;
    }
    if recursive {
        cfg.recursive = true;
    }
    if !extensions.is_empty() {
        cfg.extensions = extensions;
    }
    if skip_unchanged {
        cfg.skip_unchanged = true;
    }
    let recency_window_hours = match recent_hours {
        Some(h) => Some(h),
        None if cfg.recent_only => Some(cfg.recent_window_hours),
        None => None,
    };

    // Unset host means "sync intentionally disabled", not a misconfiguration
    if cfg.host.trim().is_empty() {
        tracing::warn!("[sync] no FTP host configured; skipping file sync");
        if !quiet {
            println!("⚠️ 未配置 FTP 主机，跳过文件同步");
        }
        return Ok(());
    }

    let mut ftp = session::open(&cfg)?;

    let opts = WalkOptions {
        extensions: cfg.extensions.clone(),
        recursive: cfg.recursive,
        recency_window_hours,
        skip_unchanged: cfg.skip_unchanged,
        draw_progress: !quiet && !json,
    };
    let (failure_tx, failure_rx) = unbounded::<crate::SyncError>();
    let start = Instant::now();
    let walk_res = TreeWalker::new(&mut ftp, &opts, failure_tx.clone())
        .run(&cfg.remote_root, Path::new(&cfg.local_root));

    // 无论成功、过滤短路还是传输失败，都要释放会话
    session::close(&mut ftp);
    drop(failure_tx);
    let failures: Vec<crate::SyncError> = failure_rx.into_iter().collect();

    match walk_res {
        Ok(stats) => {
            finalize_sync(&stats, &failures, start.elapsed().as_secs_f64(), json, quiet);
            Ok(())
        }
        Err(e) => {
            // fatal abort: still leave a failure report behind
            let _ = crate::util::write_failures_jsonl(None, &failures);
            Err(e)
        }
    }
}

// Consumes the collected failures, prints/writes summary output.
fn finalize_sync(
    stats: &SyncStats,
    failures: &[crate::SyncError],
    elapsed_secs: f64,
    json_mode: bool,
    quiet_mode: bool,
) {
    if !quiet_mode {
        crate::util::print_summary(stats, elapsed_secs);
    }

    let mut failures_path: Option<std::path::PathBuf> = None;
    if !failures.is_empty() {
        failures_path = crate::util::write_failures_jsonl(None, failures);
        if !quiet_mode
            && let Some(ref p) = failures_path
        {
            println!("失败清单已写入: {}", p.display());
        }
    }

    // Single-line JSON summary for machine consumption (doesn't replace the
    // human summary).
    if json_mode {
        let summary_obj = serde_json::json!({
            "files_transferred": stats.files_transferred,
            "bytes_transferred": stats.bytes_transferred,
            "skipped_extension": stats.skipped_extension,
            "skipped_stale": stats.skipped_stale,
            "skipped_unchanged": stats.skipped_unchanged,
            "dirs_visited": stats.dirs_visited,
            "dirs_skipped": stats.dirs_skipped,
            "failures": failures.len(),
            "elapsed_secs": elapsed_secs,
            "failures_path": failures_path.as_ref().map(|p| p.to_string_lossy().to_string()),
        });
        if let Ok(line) = serde_json::to_string(&summary_obj) {
            println!("{}", line);
        }
    }
}
