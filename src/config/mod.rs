//! Server Configuration
//!
//! Settings come from a Java-properties style file (`key=value`, `#`/`!` comments)
//! and can be overridden on the command line. Every key is optional.
//!
//! | Key             | Flag        | Default            |
//! |-----------------|-------------|--------------------|
//! | `serverPort`    | `--port`    | `12345`            |
//! | `documentRoot`  | `--root`    | `.`                |
//! | `federation`    | `--peers`   | none               |
//! | `workerCount`   | `--workers` | `4`                |
//! | `hostname`      | `--host`    | system hostname    |
//! | `bindAddress`   |             | `0.0.0.0`          |
//! | `peerTimeoutMs` |             | `5000`             |
//! | `readTimeoutMs` |             | `5000`             |
//! | `maxBodyBytes`  |             | `1048576`          |

use crate::dispatch::executor::DEFAULT_WORKER_COUNT;
use crate::federation::client::DEFAULT_PEER_TIMEOUT;
use crate::federation::types::{PeerDescriptor, PeerParseError};

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "chirps.properties";
pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

pub const USAGE: &str = "Usage: chirp-server [--config <file>] [--port <n>] [--root <dir>] \
                         [--peers <host:port,...>] [--workers <n>] [--host <name>]";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid federation peer: {0}")]
    Peer(#[from] PeerParseError),

    #[error("Missing value for {0}")]
    MissingArgument(String),

    #[error("{}", USAGE)]
    HelpRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Root for static files and `chirps.json`.
    pub document_root: PathBuf,
    pub peers: Vec<PeerDescriptor>,
    pub worker_count: usize,
    /// Host half of this server's federation identity (`host:port`).
    pub hostname: String,
    pub peer_timeout: Duration,
    /// Bound on reading one request frame off a new connection.
    pub read_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            document_root: PathBuf::from("."),
            peers: Vec::new(),
            worker_count: DEFAULT_WORKER_COUNT,
            hostname: system_hostname(),
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn system_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Splits properties text into `(key, value)` pairs. The key ends at the first
/// `=` or `:`; lines without either are ignored.
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

impl ServerConfig {
    /// Applies one setting by its properties-file key.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "serverPort" => self.port = parse_value(key, value)?,
            "documentRoot" => self.document_root = PathBuf::from(value.trim()),
            "federation" => self.peers = PeerDescriptor::parse_list(value)?,
            "workerCount" => {
                let workers: usize = parse_value(key, value)?;
                if workers == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
                self.worker_count = workers;
            }
            "hostname" => self.hostname = value.trim().to_string(),
            "bindAddress" => self.bind_address = parse_value(key, value)?,
            "peerTimeoutMs" => self.peer_timeout = Duration::from_millis(parse_value(key, value)?),
            "readTimeoutMs" => self.read_timeout = Duration::from_millis(parse_value(key, value)?),
            "maxBodyBytes" => self.max_body_bytes = parse_value(key, value)?,
            other => tracing::warn!("Ignoring unknown configuration key: {}", other),
        }
        Ok(())
    }

    pub fn from_properties(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (key, value) in parse_properties(text) {
            config.apply(&key, &value)?;
        }
        Ok(config)
    }

    /// Loads a properties file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No {} found, using default configuration", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Loaded configuration from {}", path.display());
        Self::from_properties(&text)
    }

    /// Builds the configuration from `args` (program name first): the file
    /// named by `--config` (or [`DEFAULT_CONFIG_FILE`]), then flag overrides.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        let mut overrides: Vec<(&str, &str)> = Vec::new();

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let key = match flag {
                "-h" | "--help" => return Err(ConfigError::HelpRequested),
                "--config" => None,
                "--port" => Some("serverPort"),
                "--root" => Some("documentRoot"),
                "--peers" => Some("federation"),
                "--workers" => Some("workerCount"),
                "--host" => Some("hostname"),
                _ => {
                    tracing::warn!("Ignoring unknown argument: {}", flag);
                    i += 1;
                    continue;
                }
            };
            let value = args
                .get(i + 1)
                .ok_or_else(|| ConfigError::MissingArgument(flag.to_string()))?;
            match key {
                Some(key) => overrides.push((key, value)),
                None => config_path = PathBuf::from(value),
            }
            i += 2;
        }

        let mut config = Self::load(&config_path)?;
        for (key, value) in overrides {
            config.apply(key, value)?;
        }
        Ok(config)
    }

    /// `host:port` identity given the port actually bound.
    pub fn identity(&self, bound_port: u16) -> String {
        format!("{}:{}", self.hostname, bound_port)
    }

    /// Location of the optional seed file.
    pub fn seed_file(&self) -> PathBuf {
        self.document_root.join("chirps.json")
    }
}
