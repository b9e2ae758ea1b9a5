use anyhow::Result;

use crate::config::Config;

/// `set` 子命令：更新存储的 FTP 目标配置并写回默认位置。
#[allow(clippy::too_many_arguments)]
pub fn handle_set(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    passive: Option<bool>,
    remote_root: Option<String>,
    local_root: Option<String>,
) -> Result<()> {
    let mut cfg = config.clone();
    if let Some(h) = host {
        cfg.host = h;
    }
    if let Some(p) = port {
        cfg.port = p;
    }
    if let Some(u) = username {
        cfg.username = u;
    }
    if let Some(w) = password {
        cfg.password = w;
    }
    if let Some(p) = passive {
        cfg.passive = p;
    }
    if let Some(r) = remote_root {
        cfg.remote_root = r;
    }
    if let Some(l) = local_root {
        cfg.local_root = l;
    }
    // 写回配置文件（使用默认位置） — Write back to config file (use default location)
    cfg.save_to_storage();
    println!("✅ 配置已更新: {}", Config::default_path().display());
    Ok(())
}

/// `show` 子命令：打印当前配置，密码打码。
pub fn handle_show(config: &Config) -> Result<()> {
    let mut cfg = config.clone();
    if !cfg.password.is_empty() {
        cfg.password = "********".to_string();
    }
    match serde_json::to_string_pretty(&cfg) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("⚠️ 序列化配置失败: {}", e),
    }
    Ok(())
}
