use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::connection::ConnectionSettings;
use crate::http::lines::DEFAULT_CHUNK_SIZE;
use crate::http::parser::{DEFAULT_MAX_LINE, Limits};

/// Env var naming a YAML config file.
pub const CONFIG_ENV: &str = "WICKET_CONFIG";
/// Env var overriding the bind address, as `host:port`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub backlog_factor: usize,
    /// 0 disables the idle-read timeout
    pub idle_timeout_secs: u64,
    pub read_chunk_size: usize,
    pub max_line_length: usize,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    pub index: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            workers: 4,
            backlog_factor: 8,
            idle_timeout_secs: 20,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            max_line_length: DEFAULT_MAX_LINE,
            shutdown_timeout_secs: 5,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("www"),
            index: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Loads the file named by `WICKET_CONFIG` (defaults if unset), then
    /// applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(listen) = std::env::var(LISTEN_ENV) {
            cfg.server.apply_listen(&listen)?;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let mut cfg: Config = serde_yaml::from_str(text)?;
        cfg.server.normalize();
        Ok(cfg)
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Parses `host:port` (or `[v6]:port`) into host and port.
    pub fn apply_listen(&mut self, listen: &str) -> anyhow::Result<()> {
        let (host, port) = listen
            .rsplit_once(':')
            .with_context(|| format!("{LISTEN_ENV}={listen:?} is not host:port"))?;
        let port = port
            .parse()
            .with_context(|| format!("{LISTEN_ENV}={listen:?} has an invalid port"))?;

        self.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        self.port = port;
        Ok(())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            idle_timeout: self.idle_timeout(),
            limits: Limits {
                chunk_size: self.read_chunk_size.max(1),
                max_line: self.max_line_length.max(1),
            },
        }
    }

    fn normalize(&mut self) {
        self.workers = self.workers.max(1);
        self.backlog_factor = self.backlog_factor.max(1);
    }
}
