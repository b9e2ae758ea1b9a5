use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Process-wide sync configuration, loaded once at startup from
/// `~/.ftpmirror/config.json`. A run never mutates it; `sync` CLI flags are
/// applied to a per-run copy before the run starts.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub passive: bool,
    pub remote_root: String,
    pub local_root: String,
    // 过滤与同步策略 — filter & sync policy defaults, overridable per run
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub recent_only: bool,
    pub recent_window_hours: u64,
    pub skip_unchanged: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::new(),
            port: 21,
            username: "anonymous".to_string(),
            password: String::new(),
            passive: true,
            remote_root: "/".to_string(),
            local_root: "./mirror".to_string(),
            extensions: Vec::new(),
            recursive: false,
            recent_only: false,
            recent_window_hours: 24,
            skip_unchanged: false,
        }
    }
}

impl Config {
    pub fn init() -> Self {
        match dirs::home_dir() {
            Some(home_dir) => {
                let storage_dir = home_dir.join(".".to_owned() + env!("CARGO_PKG_NAME"));
                let config_path = storage_dir.join("config.json");
                if !storage_dir.exists() {
                    std::fs::create_dir(&storage_dir).unwrap();
                    let config = Config::default();
                    config.save_to(&config_path);
                }
                Config::read_from(&config_path)
            }
            None => {
                println!("Cannot find user's home dir");
                std::process::exit(1);
            }
        }
    }

    /// Canonical config file location (`~/.ftpmirror/config.json`).
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".".to_owned() + env!("CARGO_PKG_NAME")).join("config.json")
    }

    /// Directory used for failure reports and verbose log files.
    pub fn logs_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".".to_owned() + env!("CARGO_PKG_NAME")).join("logs")
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) {
        let body = match serde_json::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("⚠️ 序列化配置失败: {}，使用空对象作为回退", e);
                "{}".to_string()
            }
        };
        if let Err(e) = std::fs::write(path, body) {
            eprintln!("⚠️ 写入配置文件失败: {}", e);
        }
    }

    pub fn save_to_storage(&self) {
        self.save_to(Config::default_path());
    }

    pub fn read_from<P: AsRef<Path>>(path: P) -> Self {
        let v = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return Config::default(),
        };
        match serde_json::from_str::<Config>(&v) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("⚠️ 解析配置 JSON 失败: {}，返回默认配置", e);
                Config::default()
            }
        }
    }
}
