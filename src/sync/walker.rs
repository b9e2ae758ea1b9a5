use std::path::Path;

use chrono::Utc;
use crossbeam_channel::Sender;

use super::executor;
use super::filter::{self, SkipReason};
use super::ftp_like::FtpLike;
use super::listing::{self, EntryKind};
use crate::SyncError;

/// Per-run walk settings, resolved once before the walk starts.
pub struct WalkOptions {
    pub extensions: Vec<String>,
    pub recursive: bool,
    /// `Some(window)` enables the recency filter.
    pub recency_window_hours: Option<u64>,
    pub skip_unchanged: bool,
    pub draw_progress: bool,
}

/// Counters accumulated across the whole walk.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncStats {
    pub files_transferred: u64,
    pub bytes_transferred: u64,
    pub skipped_extension: u64,
    pub skipped_stale: u64,
    pub skipped_unchanged: u64,
    pub dirs_visited: u64,
    pub dirs_skipped: u64,
    pub listing_failures: u64,
    pub transfer_failures: u64,
}

impl SyncStats {
    pub fn failures(&self) -> u64 {
        self.listing_failures + self.transfer_failures
    }
}

/// Drives Listing → Filter → Transfer over the remote tree. The session's
/// working-directory cursor is the one shared mutable resource; the walker
/// is its only writer and keeps a strict stack discipline: `cwd` into a
/// child, walk it, `cdup` back before touching any sibling.
pub struct TreeWalker<'a> {
    ftp: &'a mut dyn FtpLike,
    opts: &'a WalkOptions,
    failure_tx: Sender<SyncError>,
    stats: SyncStats,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        ftp: &'a mut dyn FtpLike,
        opts: &'a WalkOptions,
        failure_tx: Sender<SyncError>,
    ) -> Self {
        Self { ftp, opts, failure_tx, stats: SyncStats::default() }
    }

    /// Walk the tree rooted at the session's current directory, mirroring
    /// it into `local_root`. Only fatal errors propagate; a failed root
    /// listing is recorded like any other subtree failure and the run
    /// still completes with a report.
    pub fn run(mut self, remote_label: &str, local_root: &Path) -> anyhow::Result<SyncStats> {
        match self.walk_dir(remote_label, local_root) {
            Ok(()) => Ok(self.stats),
            Err(e) if e.is_fatal() => Err(e.into()),
            // a local root that cannot be prepared means nothing was
            // mirrored at all; deeper LocalIo errors stay subtree-scoped
            Err(e @ SyncError::LocalIo(_, _)) => Err(e.into()),
            Err(e) => {
                self.record_failure(e);
                Ok(self.stats)
            }
        }
    }

    // 单个目录：先建本地镜像目录，再列出远端并逐项处理
    fn walk_dir(&mut self, remote_label: &str, local_dir: &Path) -> Result<(), SyncError> {
        std::fs::create_dir_all(local_dir).map_err(|e| {
            SyncError::LocalIo(local_dir.display().to_string(), e.to_string())
        })?;
        let entries = listing::list_dir(self.ftp, remote_label)?;
        self.stats.dirs_visited += 1;

        for entry in entries {
            match entry.kind {
                EntryKind::Dir => {
                    if !self.opts.recursive {
                        tracing::info!(
                            "[sync][walk] skipping directory {}/{} (recursion disabled)",
                            remote_label,
                            entry.name
                        );
                        self.stats.dirs_skipped += 1;
                        continue;
                    }
                    self.descend(remote_label, &entry.name, local_dir)?;
                }
                EntryKind::File => self.process_file(remote_label, &entry, local_dir),
            }
        }
        Ok(())
    }

    /// Enter a child directory, walk it, and restore the cursor before the
    /// caller proceeds to the next sibling. A subtree failure is recorded
    /// here (one bad subdirectory must not halt the overall sync); only a
    /// fatal error — including a failed cursor restore — propagates.
    fn descend(
        &mut self,
        remote_label: &str,
        name: &str,
        local_dir: &Path,
    ) -> Result<(), SyncError> {
        let child_label = join_remote(remote_label, name);
        if let Err(e) = self.ftp.cwd(name) {
            self.record_failure(SyncError::ListDirFailed(child_label, e));
            return Ok(());
        }
        let res = self.walk_dir(&child_label, &local_dir.join(name));
        if let Err(e) = self.ftp.cdup() {
            return Err(SyncError::CwdRestoreFailed(child_label, e));
        }
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.record_failure(e);
                Ok(())
            }
        }
    }

    fn process_file(&mut self, remote_label: &str, entry: &listing::RemoteEntry, local_dir: &Path) {
        let local_path = local_dir.join(&entry.name);
        if let Some(reason) = filter::evaluate(
            entry,
            &self.opts.extensions,
            self.opts.recency_window_hours,
            self.opts.skip_unchanged,
            &local_path,
            Utc::now(),
        ) {
            tracing::debug!(
                "[sync][walk] skip {}/{}: {}",
                remote_label,
                entry.name,
                reason
            );
            match reason {
                SkipReason::Extension => self.stats.skipped_extension += 1,
                SkipReason::Stale => self.stats.skipped_stale += 1,
                SkipReason::Unchanged => self.stats.skipped_unchanged += 1,
            }
            return;
        }

        tracing::info!(
            "[sync][walk] downloading {}/{} -> {}",
            remote_label,
            entry.name,
            local_path.display()
        );
        match executor::transfer_file(self.ftp, entry, &local_path, self.opts.draw_progress) {
            Ok(bytes) => {
                self.stats.files_transferred += 1;
                self.stats.bytes_transferred += bytes;
            }
            Err(e) => {
                // one failed file must not stop the siblings
                self.stats.transfer_failures += 1;
                tracing::warn!("[sync][walk] {}", e);
                let _ = self.failure_tx.send(e);
            }
        }
    }

    fn record_failure(&mut self, e: SyncError) {
        if let SyncError::ListDirFailed(_, _) | SyncError::LocalIo(_, _) = e {
            self.stats.listing_failures += 1;
        }
        tracing::warn!("[sync][walk] {}", e);
        let _ = self.failure_tx.send(e);
    }
}

fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() || base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}
