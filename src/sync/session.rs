use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use super::ftp_like::{FtpLike, SuppaftpAdapter};
use crate::config::Config;

/// Establish the single FTP session a sync run reuses across the whole
/// walk: connect, authenticate, optionally request passive mode, switch to
/// binary transfers, and change into the configured remote root. Each stage
/// maps to its own fatal error so a misconfigured host is distinguishable
/// from bad credentials or a missing root path.
pub fn open(config: &Config) -> anyhow::Result<SuppaftpAdapter> {
    let addr = format!("{}:{}", config.host, config.port);
    let mut stream = FtpStream::connect(&addr).map_err(|e| -> anyhow::Error {
        crate::SyncError::ConnectFailed(addr.clone(), e.to_string()).into()
    })?;
    if let Err(e) = stream.login(&config.username, &config.password) {
        tracing::debug!("[sync][session] login rejected for {}: {}", addr, e);
        let _ = stream.quit();
        return Err(crate::SyncError::AuthFailed(addr).into());
    }
    // 仅在开启开关时显式请求被动模式，否则沿用客户端默认
    if config.passive {
        stream.set_mode(Mode::Passive);
    }
    if let Err(e) = stream.transfer_type(FileType::Binary) {
        let _ = stream.quit();
        return Err(crate::SyncError::ConnectFailed(addr, e.to_string()).into());
    }
    if let Err(e) = stream.cwd(&config.remote_root) {
        let _ = stream.quit();
        return Err(crate::SyncError::RemoteRootMissing(
            config.remote_root.clone(),
            e.to_string(),
        )
        .into());
    }
    let mut adapter = SuppaftpAdapter(stream);
    // 记录服务器报告的实际根路径
    let root = adapter.pwd().unwrap_or_else(|_| config.remote_root.clone());
    tracing::info!(
        "[sync][session] connected to {} (passive={}), root={}",
        config.host,
        config.passive,
        root
    );
    Ok(adapter)
}

/// Release the session. Runs on every exit path of a sync run; a failed
/// QUIT is logged and swallowed because the walk outcome is already
/// decided by then.
pub fn close(ftp: &mut dyn FtpLike) {
    if let Err(e) = ftp.quit() {
        tracing::warn!("[sync][session] close failed (ignored): {}", e);
    } else {
        tracing::debug!("[sync][session] session closed");
    }
}
