/// Repository-wide structured errors for sync-related operations.
///
/// Only the session-establishment variants abort a whole run; everything
/// else degrades to "skip this subtree" or "skip this file" (see
/// `is_fatal`).
#[derive(Debug, Clone)]
pub enum SyncError {
    // FTP session establishment (fatal)
    ConnectFailed(String, String),
    AuthFailed(String),
    RemoteRootMissing(String, String),
    // per-directory / per-file (non-fatal to the run)
    ListDirFailed(String, String),
    TransferFailed(String, String),
    LocalIo(String, String),
    // session cursor could not be restored after a descent (fatal)
    CwdRestoreFailed(String, String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use SyncError::*;
        match self {
            ConnectFailed(addr, msg) => write!(f, "连接 FTP 服务器失败: {} — {}", addr, msg),
            AuthFailed(addr) => write!(f, "FTP 认证失败: {}", addr),
            RemoteRootMissing(path, msg) => {
                write!(f, "远端根目录不存在或无法进入: {} — {}", path, msg)
            }
            ListDirFailed(dir, msg) => write!(f, "列目录失败: {} — {}", dir, msg),
            TransferFailed(name, msg) => write!(f, "文件传输失败: {} — {}", name, msg),
            LocalIo(path, msg) => write!(f, "本地 IO 错误: {} — {}", path, msg),
            CwdRestoreFailed(dir, msg) => {
                write!(f, "无法恢复会话工作目录（位于 {}）— {}", dir, msg)
            }
        }
    }
}

impl std::error::Error for SyncError {}

impl SyncError {
    /// Whether this error must abort the whole run. Session establishment
    /// failures mean the session never reached a usable state; a failed
    /// `cdup` restore leaves the session cursor pointing at the wrong
    /// directory, so every later relative listing would be wrong too.
    /// Everything else is scoped to one directory or one file.
    pub fn is_fatal(&self) -> bool {
        use SyncError::*;
        match self {
            ConnectFailed(_, _)
            | AuthFailed(_)
            | RemoteRootMissing(_, _)
            | CwdRestoreFailed(_, _) => true,
            ListDirFailed(_, _) | TransferFailed(_, _) | LocalIo(_, _) => false,
        }
    }

    /// Short machine-readable variant name used by the JSONL failure report.
    pub fn variant(&self) -> &'static str {
        use SyncError::*;
        match self {
            ConnectFailed(_, _) => "ConnectFailed",
            AuthFailed(_) => "AuthFailed",
            RemoteRootMissing(_, _) => "RemoteRootMissing",
            ListDirFailed(_, _) => "ListDirFailed",
            TransferFailed(_, _) => "TransferFailed",
            LocalIo(_, _) => "LocalIo",
            CwdRestoreFailed(_, _) => "CwdRestoreFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(SyncError::ConnectFailed("h:21".into(), "refused".into()).is_fatal());
        assert!(SyncError::AuthFailed("h:21".into()).is_fatal());
        assert!(SyncError::RemoteRootMissing("/x".into(), "550".into()).is_fatal());
        assert!(SyncError::CwdRestoreFailed("sub".into(), "lost".into()).is_fatal());
        assert!(!SyncError::ListDirFailed("sub".into(), "451".into()).is_fatal());
        assert!(!SyncError::TransferFailed("a.txt".into(), "timeout".into()).is_fatal());
        assert!(!SyncError::LocalIo("/tmp/a".into(), "denied".into()).is_fatal());
    }
}
