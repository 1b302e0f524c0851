use crate::cli::Args;
use crate::error::{GoCqError, Result};
use crate::github::DEFAULT_API_BASE;
use crate::platform::HostInfo;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default: DefaultConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DefaultConfig {
    #[serde(default = "default_repo")]
    pub repo: String,

    #[serde(default = "default_binary")]
    pub binary: String,

    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub mirror: Option<String>,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            binary: default_binary(),
            out_dir: default_out_dir(),
            api_base: default_api_base(),
            mirror: None,
        }
    }
}

fn default_repo() -> String {
    "Mrs4s/go-cqhttp".to_string()
}

fn default_binary() -> String {
    "go-cqhttp".to_string()
}

fn default_out_dir() -> String {
    "~/.local/share/gocq/bin".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// Everything one install run needs, after merging CLI, environment and file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    pub repo: String,
    pub tag: Option<String>,
    pub binary: String,
    pub out_dir: PathBuf,
    pub api_base: String,
    pub mirror: Option<String>,
}

impl InstallSettings {
    /// Built-in defaults for `out_dir`, skipping any configuration file.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        let defaults = DefaultConfig::default();
        Self {
            repo: defaults.repo,
            tag: None,
            binary: defaults.binary,
            out_dir: out_dir.into(),
            api_base: defaults.api_base,
            mirror: None,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| GoCqError::fs(path, e))?;
        toml::from_str(&content).map_err(|e| GoCqError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("gocq-install.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/gocq-install.toml"))
    }

    /// Merge configuration with command line arguments and the host environment.
    ///
    /// Precedence: CLI flags, then `GITHUB_MIRROR`, then this file, then built-ins.
    pub fn settings(&self, args: &Args, host: &HostInfo) -> Result<InstallSettings> {
        let (repo, tag) = match args.parse_repo()? {
            Some((repo, tag)) => (repo, tag),
            None => (self.default.repo.clone(), args.tag.clone()),
        };

        let out_dir = args.out_dir.as_deref().unwrap_or(&self.default.out_dir);

        let mirror = args
            .mirror
            .clone()
            .or_else(|| host.mirror.clone())
            .or_else(|| self.default.mirror.clone());

        Ok(InstallSettings {
            repo,
            tag,
            binary: self.default.binary.clone(),
            out_dir: utils::expand_home(out_dir),
            api_base: self.default.api_base.clone(),
            mirror,
        })
    }
}
