use std::path::Path;

use chrono::{DateTime, Utc};

use super::listing::RemoteEntry;

/// Why a file entry was not transferred. Directories never carry a skip
/// reason — only the recursion flag gates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Extension,
    Stale,
    Unchanged,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Extension => write!(f, "extension not in allow-list"),
            SkipReason::Stale => write!(f, "older than recency window"),
            SkipReason::Unchanged => write!(f, "local copy matches remote size"),
        }
    }
}

/// Evaluate the filter chain for one file entry, left to right with
/// short-circuit: extension allow-list, recency window, unchanged-skip.
/// `recency_window_hours` is `None` when recency filtering is disabled.
/// Returns the first failing predicate, or `None` when the entry should be
/// transferred.
pub fn evaluate(
    entry: &RemoteEntry,
    extensions: &[String],
    recency_window_hours: Option<u64>,
    skip_unchanged: bool,
    local_path: &Path,
    now: DateTime<Utc>,
) -> Option<SkipReason> {
    if !extension_allows(extensions, &entry.name) {
        return Some(SkipReason::Extension);
    }
    if let Some(window) = recency_window_hours
        && !within_recency(entry.modified_at, window, now)
    {
        return Some(SkipReason::Stale);
    }
    if skip_unchanged && local_matches_size(local_path, entry.size) {
        return Some(SkipReason::Unchanged);
    }
    None
}

/// Empty allow-list passes everything; otherwise the name must end with one
/// of the listed suffixes, case-insensitively.
pub fn extension_allows(extensions: &[String], name: &str) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let lower = name.to_ascii_lowercase();
    extensions.iter().any(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
}

/// Unknown modification time always passes — over-fetching beats silently
/// missing updates when the server cannot answer MDTM.
pub fn within_recency(
    modified_at: Option<DateTime<Utc>>,
    window_hours: u64,
    now: DateTime<Utc>,
) -> bool {
    let Some(mtime) = modified_at else {
        return true;
    };
    let age_hours = now.signed_duration_since(mtime).num_seconds() as f64 / 3600.0;
    age_hours <= window_hours as f64
}

/// True only when the remote size is known, the local file exists and its
/// byte length matches exactly. Stat failures and unknown sizes count as
/// "not yet confirmed identical" and therefore transfer.
pub fn local_matches_size(local_path: &Path, remote_size: Option<u64>) -> bool {
    let Some(size) = remote_size else {
        return false;
    };
    match std::fs::metadata(local_path) {
        Ok(md) => md.is_file() && md.len() == size,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::listing::EntryKind;
    use chrono::Duration;
    use std::io::Write;

    fn file_entry(name: &str, size: Option<u64>, modified_at: Option<DateTime<Utc>>) -> RemoteEntry {
        RemoteEntry { name: name.to_string(), kind: EntryKind::File, size, modified_at }
    }

    fn make_tmp_dir() -> std::path::PathBuf {
        let mut base = std::env::temp_dir();
        let uniq = format!(
            "fm_filter_test_{}_{}",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        );
        base.push(uniq);
        std::fs::create_dir(&base).expect("create tmp dir");
        base
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        let allow = vec![".txt".to_string()];
        assert!(extension_allows(&allow, "a.TXT"));
        assert!(extension_allows(&allow, "a.txt"));
        assert!(!extension_allows(&allow, "a.csv"));
        assert!(extension_allows(&[], "anything.bin"));
    }

    #[test]
    fn recency_window_boundaries() {
        let now = Utc::now();
        assert!(within_recency(Some(now - Duration::hours(23)), 24, now));
        assert!(!within_recency(Some(now - Duration::hours(25)), 24, now));
        // unknown mtime always passes, regardless of window
        assert!(within_recency(None, 24, now));
        assert!(within_recency(None, 0, now));
    }

    #[test]
    fn unchanged_skip_size_comparison() {
        let dir = make_tmp_dir();
        let p = dir.join("data.bin");
        let mut f = std::fs::File::create(&p).expect("create");
        f.write_all(&[0u8; 100]).expect("write");
        drop(f);

        assert!(local_matches_size(&p, Some(100)));
        assert!(!local_matches_size(&p, Some(99)));
        // unknown remote size never confirms identity
        assert!(!local_matches_size(&p, None));
        // missing local file never confirms identity
        assert!(!local_matches_size(&dir.join("absent.bin"), Some(100)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn chain_short_circuits_left_to_right() {
        let now = Utc::now();
        let dir = make_tmp_dir();
        let local = dir.join("old.log");
        std::fs::write(&local, [0u8; 10]).expect("write");

        // extension fails first even though the file is also stale and unchanged
        let entry = file_entry("old.log", Some(10), Some(now - Duration::hours(48)));
        let allow = vec![".txt".to_string()];
        assert_eq!(
            evaluate(&entry, &allow, Some(24), true, &local, now),
            Some(SkipReason::Extension)
        );
        // with extension passing, staleness wins over unchanged
        assert_eq!(
            evaluate(&entry, &[], Some(24), true, &local, now),
            Some(SkipReason::Stale)
        );
        // recency disabled: unchanged-skip is reached
        assert_eq!(
            evaluate(&entry, &[], None, true, &local, now),
            Some(SkipReason::Unchanged)
        );
        // nothing enabled: transfer
        assert_eq!(evaluate(&entry, &[], None, false, &local, now), None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_mtime_passes_recency_in_chain() {
        let now = Utc::now();
        let entry = file_entry("fresh.txt", Some(5), None);
        let missing = std::path::Path::new("/no/such/fm_local_file");
        assert_eq!(evaluate(&entry, &[], Some(1), true, missing, now), None);
    }
}
