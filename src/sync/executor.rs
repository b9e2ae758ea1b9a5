use std::io::Write;
use std::path::Path;

use filetime::FileTime;

use super::ftp_like::FtpLike;
use super::listing::RemoteEntry;
use crate::SyncError;

/// Progress event emitted while streaming one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressTick {
    /// Whole-percentage value changed (total size known).
    Percent(u8),
    /// Cumulative byte count crossed another 1 MiB boundary (size unknown).
    MibBoundary(u64),
    /// Final marker: the transfer completed with this many bytes.
    Done(u64),
}

/// Per-file progress counters, owned by exactly one transfer invocation.
/// Emits a tick only when the whole-percent value changes, or — when the
/// total size is unknown — each time another whole MiB has been written.
pub struct TransferProgress {
    total: Option<u64>,
    written: u64,
    last_percent: Option<u8>,
    last_mib: u64,
}

impl TransferProgress {
    pub fn new(total: Option<u64>) -> Self {
        Self { total, written: 0, last_percent: None, last_mib: 0 }
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Record `n` more bytes; returns a tick when a report boundary was
    /// crossed.
    pub fn advance(&mut self, n: u64) -> Option<ProgressTick> {
        self.written += n;
        match self.total {
            Some(total) if total > 0 => {
                let pct = ((self.written.min(total) * 100) / total) as u8;
                if self.last_percent != Some(pct) {
                    self.last_percent = Some(pct);
                    return Some(ProgressTick::Percent(pct));
                }
                None
            }
            // zero-byte or unknown total: fall back to MiB boundaries
            _ => {
                let mib = self.written >> 20;
                if mib > self.last_mib {
                    self.last_mib = mib;
                    return Some(ProgressTick::MibBoundary(mib));
                }
                None
            }
        }
    }

    /// Final 100%-equivalent marker.
    pub fn finish(&self) -> ProgressTick {
        ProgressTick::Done(self.written)
    }
}

/// Stream one remote file into `local_path` (truncating binary write),
/// reporting progress per chunk, then stamp the local mtime from the remote
/// one (queried on demand when the listing did not know it). A mid-stream
/// failure removes the partial file and fails only this entry; a failed
/// mtime stamp is logged and ignored.
pub fn transfer_file(
    ftp: &mut dyn FtpLike,
    entry: &RemoteEntry,
    local_path: &Path,
    draw_progress: bool,
) -> Result<u64, SyncError> {
    let mut local_f = std::fs::File::create(local_path).map_err(|e| {
        SyncError::LocalIo(local_path.display().to_string(), e.to_string())
    })?;

    let pb = if draw_progress {
        Some(crate::util::file_progress_bar(entry.size, &entry.name))
    } else {
        None
    };

    let mut progress = TransferProgress::new(entry.size);
    let name = entry.name.clone();
    let stream_res = {
        let pb_ref = pb.as_ref();
        let mut sink = |chunk: &[u8]| -> Result<(), String> {
            local_f.write_all(chunk).map_err(|e| format!("local write failed: {}", e))?;
            if let Some(tick) = progress.advance(chunk.len() as u64) {
                match tick {
                    ProgressTick::Percent(p) => {
                        tracing::debug!("[sync][retr] {} {}%", name, p)
                    }
                    ProgressTick::MibBoundary(mib) => {
                        tracing::debug!("[sync][retr] {} {} MiB", name, mib)
                    }
                    ProgressTick::Done(_) => {}
                }
            }
            if let Some(fpb) = pb_ref {
                fpb.set_position(progress.bytes_written());
            }
            Ok(())
        };
        ftp.retr(&entry.name, &mut sink)
    };

    let bytes = match stream_res {
        Ok(b) => b,
        Err(e) => {
            if let Some(fpb) = pb {
                fpb.finish_and_clear();
            }
            let _ = std::fs::remove_file(local_path);
            return Err(SyncError::TransferFailed(entry.name.clone(), e));
        }
    };
    if let Err(e) = local_f.sync_all() {
        if let Some(fpb) = pb {
            fpb.finish_and_clear();
        }
        let _ = std::fs::remove_file(local_path);
        return Err(SyncError::TransferFailed(
            entry.name.clone(),
            format!("local sync failed: {}", e),
        ));
    }
    drop(local_f);
    if let ProgressTick::Done(total) = progress.finish() {
        tracing::debug!("[sync][retr] {} done ({} bytes)", entry.name, total);
    }
    if let Some(fpb) = pb {
        fpb.finish_and_clear();
    }

    stamp_mtime(ftp, entry, local_path);
    Ok(bytes)
}

/// Post-transfer mtime preservation. Queries MDTM on demand when the
/// listing carried no timestamp; every failure here is non-fatal.
fn stamp_mtime(ftp: &mut dyn FtpLike, entry: &RemoteEntry, local_path: &Path) {
    let mtime = match entry.modified_at {
        Some(t) => Some(t),
        None => match ftp.mdtm(&entry.name) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::debug!("[sync][retr] MDTM {} after transfer failed: {}", entry.name, e);
                None
            }
        },
    };
    if let Some(t) = mtime {
        let ft = FileTime::from_unix_time(t.timestamp(), t.timestamp_subsec_nanos());
        if let Err(e) = filetime::set_file_mtime(local_path, ft) {
            tracing::debug!(
                "[sync][retr] set mtime on {} failed (ignored): {}",
                local_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::listing::EntryKind;
    use crate::sync::mock_ftp::MockFtp;
    use chrono::{TimeZone, Utc};

    fn make_tmp_dir() -> std::path::PathBuf {
        let mut base = std::env::temp_dir();
        let uniq = format!(
            "fm_exec_test_{}_{}",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        );
        base.push(uniq);
        std::fs::create_dir(&base).expect("create tmp dir");
        base
    }

    #[test]
    fn percent_ticks_only_on_whole_percent_change() {
        let mut p = TransferProgress::new(Some(200));
        assert_eq!(p.advance(50), Some(ProgressTick::Percent(25)));
        // 51/200 is still 25%
        assert_eq!(p.advance(1), None);
        assert_eq!(p.advance(49), Some(ProgressTick::Percent(50)));
        assert_eq!(p.advance(100), Some(ProgressTick::Percent(100)));
        assert_eq!(p.finish(), ProgressTick::Done(200));
    }

    #[test]
    fn mib_boundary_ticks_when_total_unknown() {
        const HALF_MIB: u64 = 512 * 1024;
        let mut p = TransferProgress::new(None);
        assert_eq!(p.advance(HALF_MIB), None);
        assert_eq!(p.advance(HALF_MIB), Some(ProgressTick::MibBoundary(1)));
        assert_eq!(p.advance(HALF_MIB), None);
        assert_eq!(p.advance(3 * HALF_MIB), Some(ProgressTick::MibBoundary(3)));
        assert_eq!(p.finish(), ProgressTick::Done(6 * HALF_MIB));
    }

    #[test]
    fn transfer_writes_bytes_and_stamps_mtime() {
        let dir = make_tmp_dir();
        let mtime = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        let mut ftp = MockFtp::builder()
            .file_with_mtime("a.bin", b"0123456789", mtime)
            .build();
        let entry = RemoteEntry {
            name: "a.bin".into(),
            kind: EntryKind::File,
            size: Some(10),
            modified_at: Some(mtime),
        };
        let target = dir.join("a.bin");
        let n = transfer_file(&mut ftp, &entry, &target, false).expect("transfer ok");
        assert_eq!(n, 10);
        assert_eq!(std::fs::read(&target).unwrap(), b"0123456789");
        let md = std::fs::metadata(&target).unwrap();
        let got = FileTime::from_last_modification_time(&md);
        assert_eq!(got.unix_seconds(), mtime.timestamp());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn transfer_queries_mdtm_when_listing_had_no_mtime() {
        let dir = make_tmp_dir();
        let mtime = Utc.with_ymd_and_hms(2023, 7, 4, 0, 0, 0).unwrap();
        let mut ftp = MockFtp::builder().file_with_mtime("b.bin", b"xy", mtime).build();
        let entry = RemoteEntry {
            name: "b.bin".into(),
            kind: EntryKind::File,
            size: Some(2),
            modified_at: None,
        };
        let target = dir.join("b.bin");
        transfer_file(&mut ftp, &entry, &target, false).expect("transfer ok");
        let md = std::fs::metadata(&target).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&md).unix_seconds(),
            mtime.timestamp()
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mid_stream_failure_removes_partial_file() {
        let dir = make_tmp_dir();
        let mut ftp = MockFtp::builder()
            .file("big.bin", &vec![7u8; 64])
            .fail_retr("big.bin")
            .build();
        let entry = RemoteEntry {
            name: "big.bin".into(),
            kind: EntryKind::File,
            size: Some(64),
            modified_at: None,
        };
        let target = dir.join("big.bin");
        let res = transfer_file(&mut ftp, &entry, &target, false);
        assert!(matches!(res, Err(SyncError::TransferFailed(_, _))));
        assert!(!target.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
