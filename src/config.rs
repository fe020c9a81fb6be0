//! Ambient configuration: a small TOML file sibling to the cache
//! directory, `.git/remote-igis/config.toml`, holding settings orthogonal to
//! the wire schema. `load_or_default` means a missing file is not an error.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};

fn default_ipfs_api() -> String {
    "http://127.0.0.1:5001".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// settings for one invocation of the remote helper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// base URL of the Kubo HTTP API
    #[serde(default = "default_ipfs_api")]
    pub ipfs_api: String,
    /// per-request timeout against the IPFS node
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ipfs_api: default_ipfs_api(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// load from `path`; a missing file is not an error, defaults apply.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_path(path),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote-igis/config.toml");
        let config = Config {
            ipfs_api: "http://localhost:5001".to_owned(),
            request_timeout_secs: 60,
        };
        config.save(&path).unwrap();
        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = 5\n").unwrap();
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.ipfs_api, default_ipfs_api());
        assert_eq!(config.request_timeout_secs, 5);
    }
}
