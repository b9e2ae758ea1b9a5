use chrono::{DateTime, NaiveDateTime, Utc};

use super::ftp_like::FtpLike;
use crate::SyncError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One row of a remote directory listing, uniform across the batch (MLSD)
/// and legacy (NLST + probes) paths. Constructed fresh per listing call and
/// never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// List the session's current directory eagerly. Preferred path is the
/// batch-metadata MLSD command (one round trip); when the server lacks it
/// or it errors, fall back to NLST with per-name metadata probes (O(n)
/// extra round trips). Both paths yield the same `RemoteEntry` shape so
/// downstream filtering and transfer never care which one ran.
pub fn list_dir(ftp: &mut dyn FtpLike, dir_label: &str) -> Result<Vec<RemoteEntry>, SyncError> {
    match ftp.mlsd_lines() {
        Ok(lines) => {
            let entries: Vec<RemoteEntry> =
                lines.iter().filter_map(|l| parse_mlsd_line(l)).collect();
            tracing::debug!(
                "[sync][list] MLSD {} -> {} entries",
                dir_label,
                entries.len()
            );
            Ok(entries)
        }
        Err(e) => {
            tracing::debug!(
                "[sync][list] MLSD unavailable in {} ({}); falling back to NLST probes",
                dir_label,
                e
            );
            list_dir_legacy(ftp, dir_label)
        }
    }
}

fn list_dir_legacy(ftp: &mut dyn FtpLike, dir_label: &str) -> Result<Vec<RemoteEntry>, SyncError> {
    let names = ftp
        .name_list()
        .map_err(|e| SyncError::ListDirFailed(dir_label.to_string(), e))?;
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        if name == "." || name == ".." {
            continue;
        }
        let kind = probe_kind(ftp, &name)
            .map_err(|e| SyncError::ListDirFailed(dir_label.to_string(), e))?;
        let (size, modified_at) = if kind == EntryKind::Dir {
            (None, None)
        } else {
            probe_file_metadata(ftp, &name)
        };
        out.push(RemoteEntry { name, kind, size, modified_at });
    }
    tracing::debug!("[sync][list] NLST {} -> {} entries", dir_label, out.len());
    Ok(out)
}

/// Directory probe: change into the name and immediately back. A failed
/// `cwd` means "not a directory" (plain file, or no permission — either way
/// it is not descendable). A failed `cdup` after a successful `cwd` leaves
/// the session cursor in the child, which would corrupt every later probe
/// in this directory, so it aborts the listing instead of guessing.
fn probe_kind(ftp: &mut dyn FtpLike, name: &str) -> Result<EntryKind, String> {
    if ftp.cwd(name).is_err() {
        return Ok(EntryKind::File);
    }
    ftp.cdup()
        .map_err(|e| format!("probe of '{}' could not restore cwd: {}", name, e))?;
    Ok(EntryKind::Dir)
}

/// SIZE/MDTM probes degrade to `None` on any failure — metadata queries are
/// never fatal, and a missing mtime must not later cause a skip.
fn probe_file_metadata(
    ftp: &mut dyn FtpLike,
    name: &str,
) -> (Option<u64>, Option<DateTime<Utc>>) {
    let size = match ftp.size(name) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::debug!("[sync][list] SIZE {} failed: {}", name, e);
            None
        }
    };
    let modified_at = match ftp.mdtm(name) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::debug!("[sync][list] MDTM {} failed: {}", name, e);
            None
        }
    };
    (size, modified_at)
}

/// Parse one MLSD fact line (`fact=value;...;fact=value; name`). Returns
/// `None` for the `.`/`..`/`cdir`/`pdir` rows and for lines with no name.
/// Unknown facts are ignored; a missing `type` fact defaults to File.
pub fn parse_mlsd_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (facts, name) = line.split_once(' ')?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    let mut kind = EntryKind::File;
    let mut size: Option<u64> = None;
    let mut modified_at: Option<DateTime<Utc>> = None;
    for fact in facts.split(';').filter(|f| !f.is_empty()) {
        let Some((key, value)) = fact.split_once('=') else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "type" => match value.to_ascii_lowercase().as_str() {
                "dir" => kind = EntryKind::Dir,
                // the listing's own directory and its parent
                "cdir" | "pdir" => return None,
                _ => kind = EntryKind::File,
            },
            "size" => size = value.parse::<u64>().ok(),
            "modify" => modified_at = parse_mdtm_stamp(value),
            _ => {}
        }
    }
    Some(RemoteEntry { name: name.to_string(), kind, size, modified_at })
}

/// Parse the fixed `YYYYMMDDHHMMSS` UTC timestamp used by MDTM replies and
/// MLSD `modify` facts. A fractional suffix (`.sss`) is tolerated and
/// ignored; anything malformed yields `None`.
pub fn parse_mdtm_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let head = stamp.split('.').next().unwrap_or(stamp);
    if head.len() != 14 || !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(head, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mlsd_file_with_all_facts() {
        let e = parse_mlsd_line("type=file;size=4096;modify=20240101120000; report.txt").unwrap();
        assert_eq!(e.name, "report.txt");
        assert_eq!(e.kind, EntryKind::File);
        assert_eq!(e.size, Some(4096));
        assert_eq!(
            e.modified_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn mlsd_dir_and_case_insensitive_facts() {
        let e = parse_mlsd_line("Type=DIR;Modify=20230615080910; photos").unwrap();
        assert_eq!(e.kind, EntryKind::Dir);
        assert_eq!(e.name, "photos");
        assert!(e.modified_at.is_some());
    }

    #[test]
    fn mlsd_skips_cdir_and_pdir() {
        assert!(parse_mlsd_line("type=cdir;modify=20240101120000; .").is_none());
        assert!(parse_mlsd_line("type=pdir;modify=20240101120000; ..").is_none());
        // dot names are suppressed even without a type fact
        assert!(parse_mlsd_line("size=0; .").is_none());
        assert!(parse_mlsd_line("size=0; ..").is_none());
    }

    #[test]
    fn mlsd_missing_facts_degrade_to_unknown() {
        let e = parse_mlsd_line("type=file; data.bin").unwrap();
        assert_eq!(e.size, None);
        assert_eq!(e.modified_at, None);
    }

    #[test]
    fn mlsd_name_may_contain_spaces() {
        let e = parse_mlsd_line("type=file;size=10; annual report 2024.pdf").unwrap();
        assert_eq!(e.name, "annual report 2024.pdf");
    }

    #[test]
    fn mlsd_unknown_facts_are_ignored() {
        let e =
            parse_mlsd_line("type=file;size=7;unique=aa01;unix.mode=0644; x.txt").unwrap();
        assert_eq!(e.size, Some(7));
    }

    #[test]
    fn mlsd_garbage_line_is_none() {
        assert!(parse_mlsd_line("").is_none());
        assert!(parse_mlsd_line("no-space-separator").is_none());
    }

    #[test]
    fn mdtm_stamp_parses_and_rejects() {
        assert_eq!(
            parse_mdtm_stamp("20240131235959"),
            Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap())
        );
        // fractional seconds are tolerated
        assert_eq!(
            parse_mdtm_stamp("20240131235959.123"),
            Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap())
        );
        assert_eq!(parse_mdtm_stamp("2024013123595"), None);
        assert_eq!(parse_mdtm_stamp("not-a-stamp"), None);
        assert_eq!(parse_mdtm_stamp("20241331235959"), None);
    }
}
