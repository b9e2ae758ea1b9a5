#![allow(dead_code)]
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::ftp_like::FtpLike;

// In-memory FtpLike implementation with a navigable directory tree, MLSD
// on/off switching and per-file failure injection. Lives in the crate (not
// behind cfg(test)) so integration tests under tests/ can drive the walker
// against it, mirroring how workers keep their mock IO helpers available.

struct MockFile {
    data: Vec<u8>,
    mtime: Option<DateTime<Utc>>,
    // opaque files answer neither SIZE/MDTM probes nor carry MLSD facts
    opaque: bool,
    fail_retr: bool,
}

#[derive(Default)]
struct MockDir {
    files: BTreeMap<String, MockFile>,
    dirs: BTreeMap<String, MockDir>,
}

pub struct MockFtp {
    root: MockDir,
    cwd_stack: Vec<String>,
    mlsd_supported: bool,
    pub retr_calls: u64,
    pub mlsd_calls: u64,
    pub nlst_calls: u64,
    pub quit_calls: u64,
}

pub struct MockFtpBuilder {
    root: MockDir,
    mlsd_supported: bool,
}

impl MockFtp {
    pub fn builder() -> MockFtpBuilder {
        MockFtpBuilder { root: MockDir::default(), mlsd_supported: true }
    }

    /// Depth of the session cursor relative to the walk root.
    pub fn cwd_depth(&self) -> usize {
        self.cwd_stack.len()
    }

    fn current_dir(&self) -> &MockDir {
        let mut dir = &self.root;
        for seg in &self.cwd_stack {
            dir = dir.dirs.get(seg).expect("cwd stack points at existing dirs");
        }
        dir
    }
}

impl MockFtpBuilder {
    fn dir_at_mut(&mut self, path: &[&str]) -> &mut MockDir {
        let mut dir = &mut self.root;
        for seg in path {
            dir = dir.dirs.entry(seg.to_string()).or_default();
        }
        dir
    }

    fn insert(&mut self, path: &str, file: MockFile) {
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (name, parents) = segs.split_last().expect("non-empty file path");
        let dir = self.dir_at_mut(parents);
        dir.files.insert(name.to_string(), file);
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.insert(path, MockFile { data: data.to_vec(), mtime: None, opaque: false, fail_retr: false });
        self
    }

    pub fn file_with_mtime(mut self, path: &str, data: &[u8], mtime: DateTime<Utc>) -> Self {
        self.insert(
            path,
            MockFile { data: data.to_vec(), mtime: Some(mtime), opaque: false, fail_retr: false },
        );
        self
    }

    /// File whose SIZE/MDTM probes fail and whose MLSD line carries no facts
    /// beyond the type — exercises the "metadata unknown" paths.
    pub fn opaque_file(mut self, path: &str, data: &[u8]) -> Self {
        self.insert(path, MockFile { data: data.to_vec(), mtime: None, opaque: true, fail_retr: false });
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.dir_at_mut(&segs);
        self
    }

    /// Make the retrieve of `path` yield a partial chunk then error,
    /// simulating a connection drop mid-stream.
    pub fn fail_retr(mut self, path: &str) -> Self {
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (name, parents) = segs.split_last().expect("non-empty file path");
        let dir = self.dir_at_mut(parents);
        dir.files.get_mut(*name).expect("fail_retr target must exist").fail_retr = true;
        self
    }

    /// Simulate a server without the batch-metadata listing command.
    pub fn without_mlsd(mut self) -> Self {
        self.mlsd_supported = false;
        self
    }

    pub fn build(self) -> MockFtp {
        MockFtp {
            root: self.root,
            cwd_stack: Vec::new(),
            mlsd_supported: self.mlsd_supported,
            retr_calls: 0,
            mlsd_calls: 0,
            nlst_calls: 0,
            quit_calls: 0,
        }
    }
}

impl FtpLike for MockFtp {
    fn cwd(&mut self, path: &str) -> Result<(), String> {
        if path == ".." {
            return self.cdup();
        }
        if self.current_dir().dirs.contains_key(path) {
            self.cwd_stack.push(path.to_string());
            Ok(())
        } else {
            Err(format!("550 {}: No such directory", path))
        }
    }

    fn cdup(&mut self) -> Result<(), String> {
        match self.cwd_stack.pop() {
            Some(_) => Ok(()),
            None => Err("550 already at root".to_string()),
        }
    }

    fn pwd(&mut self) -> Result<String, String> {
        Ok(format!("/{}", self.cwd_stack.join("/")))
    }

    fn mlsd_lines(&mut self) -> Result<Vec<String>, String> {
        self.mlsd_calls += 1;
        if !self.mlsd_supported {
            return Err("500 Unknown command MLSD".to_string());
        }
        let dir = self.current_dir();
        let mut lines = vec![
            "type=cdir;modify=20240101000000; .".to_string(),
            "type=pdir;modify=20240101000000; ..".to_string(),
        ];
        for name in dir.dirs.keys() {
            lines.push(format!("type=dir; {}", name));
        }
        for (name, f) in &dir.files {
            if f.opaque {
                lines.push(format!("type=file; {}", name));
            } else {
                let mut facts = format!("type=file;size={}", f.data.len());
                if let Some(t) = f.mtime {
                    facts.push_str(&format!(";modify={}", t.format("%Y%m%d%H%M%S")));
                }
                lines.push(format!("{}; {}", facts, name));
            }
        }
        Ok(lines)
    }

    fn name_list(&mut self) -> Result<Vec<String>, String> {
        self.nlst_calls += 1;
        let dir = self.current_dir();
        // real servers often include the dot entries in NLST output
        let mut names = vec![".".to_string(), "..".to_string()];
        names.extend(dir.dirs.keys().cloned());
        names.extend(dir.files.keys().cloned());
        Ok(names)
    }

    fn size(&mut self, name: &str) -> Result<u64, String> {
        match self.current_dir().files.get(name) {
            Some(f) if !f.opaque => Ok(f.data.len() as u64),
            Some(_) => Err("550 SIZE not available".to_string()),
            None => Err(format!("550 {}: not a plain file", name)),
        }
    }

    fn mdtm(&mut self, name: &str) -> Result<DateTime<Utc>, String> {
        match self.current_dir().files.get(name) {
            Some(f) if !f.opaque => {
                f.mtime.ok_or_else(|| "550 no modification time".to_string())
            }
            _ => Err(format!("550 {}: no modification time", name)),
        }
    }

    fn retr(
        &mut self,
        name: &str,
        sink: &mut dyn FnMut(&[u8]) -> Result<(), String>,
    ) -> Result<u64, String> {
        self.retr_calls += 1;
        let (data, fail) = match self.current_dir().files.get(name) {
            Some(f) => (f.data.clone(), f.fail_retr),
            None => return Err(format!("550 {}: No such file", name)),
        };
        if fail {
            // deliver a partial chunk, then drop the stream
            let half = data.len() / 2;
            if half > 0 {
                sink(&data[..half])?;
            }
            return Err("426 connection closed; transfer aborted".to_string());
        }
        let mut total = 0u64;
        for chunk in data.chunks(8 * 1024) {
            sink(chunk)?;
            total += chunk.len() as u64;
        }
        Ok(total)
    }

    fn quit(&mut self) -> Result<(), String> {
        self.quit_calls += 1;
        Ok(())
    }
}
