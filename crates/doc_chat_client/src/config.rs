//! Client config load/save for `~/.doc-chat/config.yaml`.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000/api/chat";
pub const DEFAULT_MIN_ROWS: u16 = 1;
pub const DEFAULT_MAX_ROWS: u16 = 8;

/// Proxy section (url of the chat endpoint).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProxySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Downloads section (directory fetched documents are saved into).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DownloadsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// Input section (height bounds of the compose box, in rows).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InputSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rows: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u16>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub proxy: ProxySection,
    #[serde(default)]
    pub downloads: DownloadsSection,
    #[serde(default)]
    pub input: InputSection,
}

impl Config {
    pub fn proxy_url(&self) -> &str {
        self.proxy.url.as_deref().unwrap_or(DEFAULT_PROXY_URL)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.downloads
            .directory
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// `(min, max)` with `1 <= min <= max`.
    pub fn input_rows(&self) -> (u16, u16) {
        let min = self.input.min_rows.unwrap_or(DEFAULT_MIN_ROWS).max(1);
        let max = self.input.max_rows.unwrap_or(DEFAULT_MAX_ROWS).max(min);
        (min, max)
    }
}

/// Config load/save error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to determine config path (set --config or DOC_CHAT_CONFIG)")]
    NoPath,
}

/// Returns the default config file path: `~/.doc-chat/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".doc-chat").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load config from `path`, falling back to defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load(path)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
