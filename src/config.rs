use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_VAR: &str = "PLATBENCH_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
}

/// Listen endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

/// Per-connection buffer sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Initial input buffer capacity and minimum free space per read.
    pub read_buffer_size: usize,
    /// Initial output buffer capacity.
    pub write_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 4096,
            write_buffer_size: 4096,
        }
    }
}

impl Config {
    /// Loads the process configuration.
    ///
    /// Starts from defaults, reads the YAML file named by
    /// `PLATBENCH_CONFIG` if set, then applies `LISTEN` and `PORT`.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading variables through `lookup`.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env(lookup)?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `LISTEN` is `host:port`; `PORT` overrides just the port.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(listen) = lookup("LISTEN") {
            let (address, port) = listen
                .rsplit_once(':')
                .with_context(|| format!("LISTEN must be host:port, got {listen:?}"))?;
            self.server.address = address.trim_start_matches('[').trim_end_matches(']').to_string();
            self.server.port = port
                .parse()
                .with_context(|| format!("invalid port in LISTEN: {port:?}"))?;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("invalid PORT: {port:?}"))?;
        }
        self.validate()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.server.address.is_empty() {
            anyhow::bail!("server.address must not be empty");
        }
        if self.connection.read_buffer_size == 0 || self.connection.write_buffer_size == 0 {
            anyhow::bail!("connection buffer sizes must be non-zero");
        }
        Ok(())
    }

    /// `address:port`, bracketing IPv6 literals.
    pub fn listen_addr(&self) -> String {
        if self.server.address.contains(':') {
            format!("[{}]:{}", self.server.address, self.server.port)
        } else {
            format!("{}:{}", self.server.address, self.server.port)
        }
    }
}
