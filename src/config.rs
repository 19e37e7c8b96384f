use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tokio::sync::Semaphore;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_THREAD_RATIO: f64 = 2.0;
pub const DEFAULT_KEEP_ALIVE_TIMEOUT_MS: u64 = 7000;

/// Construction-time server settings.
///
/// Every field has a default, so a YAML document only needs the keys it
/// changes:
///
/// ```yaml
/// port: 0
/// thread_ratio: 0.5
/// keep_alive_timeout_ms: 2000
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub bind_addr: IpAddr,
    /// Listening port; 0 lets the OS pick one
    pub port: u16,
    /// Worker pool size as a multiple of the available parallelism.
    /// Zero or negative means no limit.
    pub thread_ratio: f64,
    /// How long an idle connection waits for its next request
    pub keep_alive_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            thread_ratio: DEFAULT_THREAD_RATIO,
            keep_alive_timeout_ms: DEFAULT_KEEP_ALIVE_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `MINIHTTP_PORT`, `MINIHTTP_THREAD_RATIO` and
    /// `MINIHTTP_KEEP_ALIVE_MS` when set.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Ok(port) = std::env::var("MINIHTTP_PORT") {
            cfg.port = port.parse().context("MINIHTTP_PORT is not a port number")?;
        }
        if let Ok(ratio) = std::env::var("MINIHTTP_THREAD_RATIO") {
            cfg.thread_ratio = ratio
                .parse()
                .context("MINIHTTP_THREAD_RATIO is not a number")?;
        }
        if let Ok(ms) = std::env::var("MINIHTTP_KEEP_ALIVE_MS") {
            cfg.keep_alive_timeout_ms = ms
                .parse()
                .context("MINIHTTP_KEEP_ALIVE_MS is not a number of milliseconds")?;
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid server configuration")
    }

    pub fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    /// Shorthand for a config listening on `port`, everything else default.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_millis(self.keep_alive_timeout_ms)
    }

    /// Number of connections served at once: `ceil(parallelism × ratio)`,
    /// at least one and at most [`Semaphore::MAX_PERMITS`]. `None` when the
    /// ratio selects an unbounded pool.
    pub fn worker_pool_size(&self) -> Option<usize> {
        if self.thread_ratio <= 0.0 {
            return None;
        }
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let size = (parallelism as f64 * self.thread_ratio).ceil() as usize;
        Some(size.clamp(1, Semaphore::MAX_PERMITS))
    }
}
