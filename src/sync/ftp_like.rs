use chrono::{DateTime, Utc};

/// Read buffer for binary retrieve streams (1 MiB).
const RETR_BUF_SIZE: usize = 1024 * 1024;

/// Trait abstracting the FTP operations the sync engine consumes. Methods
/// return `Result<_, String>` so tests can inject mock sessions without
/// dragging the client crate's error type through the engine. The live
/// session carries one mutable working-directory cursor; `cwd`/`cdup`
/// mutate it and everything else is relative to it.
pub trait FtpLike {
    fn cwd(&mut self, path: &str) -> Result<(), String>;
    fn cdup(&mut self) -> Result<(), String>;
    fn pwd(&mut self) -> Result<String, String>;
    /// Batch-metadata listing of the current directory (MLSD fact lines).
    /// Err both when the server lacks the command and when it fails.
    fn mlsd_lines(&mut self) -> Result<Vec<String>, String>;
    /// Legacy name-only listing of the current directory (NLST).
    fn name_list(&mut self) -> Result<Vec<String>, String>;
    fn size(&mut self, name: &str) -> Result<u64, String>;
    fn mdtm(&mut self, name: &str) -> Result<DateTime<Utc>, String>;
    /// Binary retrieve streaming each chunk through `sink`. Returns the
    /// total byte count. A sink error aborts the retrieve but must leave
    /// the control connection usable.
    fn retr(
        &mut self,
        name: &str,
        sink: &mut dyn FnMut(&[u8]) -> Result<(), String>,
    ) -> Result<u64, String>;
    fn quit(&mut self) -> Result<(), String>;
}

/// Adapter that owns a `suppaftp::FtpStream` and implements `FtpLike` so the
/// engine can run against either a live session or a test mock.
pub struct SuppaftpAdapter(pub suppaftp::FtpStream);

impl FtpLike for SuppaftpAdapter {
    fn cwd(&mut self, path: &str) -> Result<(), String> {
        self.0.cwd(path).map_err(|e| e.to_string())
    }

    fn cdup(&mut self) -> Result<(), String> {
        self.0.cdup().map_err(|e| e.to_string())
    }

    fn pwd(&mut self) -> Result<String, String> {
        self.0.pwd().map_err(|e| e.to_string())
    }

    fn mlsd_lines(&mut self) -> Result<Vec<String>, String> {
        self.0.mlsd(None).map_err(|e| e.to_string())
    }

    fn name_list(&mut self) -> Result<Vec<String>, String> {
        self.0.nlst(None).map_err(|e| e.to_string())
    }

    fn size(&mut self, name: &str) -> Result<u64, String> {
        self.0.size(name).map(|s| s as u64).map_err(|e| e.to_string())
    }

    fn mdtm(&mut self, name: &str) -> Result<DateTime<Utc>, String> {
        // MDTM replies are UTC per RFC 3659
        self.0.mdtm(name).map(|naive| naive.and_utc()).map_err(|e| e.to_string())
    }

    fn retr(
        &mut self,
        name: &str,
        sink: &mut dyn FnMut(&[u8]) -> Result<(), String>,
    ) -> Result<u64, String> {
        use std::io::Read;
        let mut stream = self.0.retr_as_stream(name).map_err(|e| e.to_string())?;
        let mut buf = vec![0u8; RETR_BUF_SIZE];
        let mut total: u64 = 0;
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Err(e) = sink(&buf[..n]) {
                        // drain the data connection so the control channel
                        // stays in sync, then report the sink failure
                        let _ = self.0.finalize_retr_stream(stream);
                        return Err(e);
                    }
                    total += n as u64;
                }
                Err(e) => {
                    let _ = self.0.finalize_retr_stream(stream);
                    return Err(e.to_string());
                }
            }
        }
        self.0.finalize_retr_stream(stream).map_err(|e| e.to_string())?;
        Ok(total)
    }

    fn quit(&mut self) -> Result<(), String> {
        self.0.quit().map_err(|e| e.to_string())
    }
}

impl SuppaftpAdapter {
    pub fn into_inner(self) -> suppaftp::FtpStream {
        self.0
    }
}
