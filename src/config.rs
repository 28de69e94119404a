use std::fs;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories_next::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix for returned links. Derived from request headers when unset.
    pub base_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    /// Lets requests override the current time with the `x-test-now-ms` header.
    pub test_mode: bool,
    pub storage: Storage,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            test_mode: false,
            storage: Storage::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub kind: StorageKind,
    pub file: FileStorage,
    pub sql: SqlStorage,
    #[cfg(feature = "redis")]
    pub redis: RedisStorage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileStorage {
    pub dir: PathBuf,
}

impl Default for FileStorage {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("pastes"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqlStorage {
    pub url: String,
}

impl Default for SqlStorage {
    fn default() -> Self {
        Self {
            url: "sqlite://pastelite.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[cfg(feature = "redis")]
pub struct RedisStorage {
    pub url: String,
}

#[cfg(feature = "redis")]
impl Default for RedisStorage {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    File,
    Sql,
    #[cfg(feature = "redis")]
    Redis,
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing file at the default location yields the default config; a
    /// missing file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match fs::read_to_string(&path) {
            Ok(source) => Self::parse(&source)
                .with_context(|| format!("failed to parse config {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound && !required => {
                debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("failed to read config {}", path.display()))
            }
        }
    }

    pub fn parse(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pastelite").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
