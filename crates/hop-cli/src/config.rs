use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hop::push::DEFAULT_WORKERS;

pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Account API key, used when neither `--key` nor `BUNNY_API_KEY` is set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub push: PushSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PushSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Deadline for a whole push, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Remote directory to push into when `--to` is not given.
    #[serde(default)]
    pub remote_prefix: String,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            remote_prefix: String::new(),
        }
    }
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Config file path: `~/.config/hop/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hop").join("config.toml"))
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Load config from `path` (or the default location), falling back to
/// defaults if the file is missing or malformed.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
        return AppConfig::default();
    };

    let Ok(contents) = std::fs::read_to_string(&path) else {
        log::debug!("no config at {}", path.display());
        return AppConfig::default();
    };

    match parse_config(&contents) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "warning: failed to parse config at {}, using defaults: {e}",
                path.display()
            );
            AppConfig::default()
        }
    }
}

impl AppConfig {
    /// The flag (or its environment variable) wins over the config file.
    pub fn api_key(&self, flag: Option<&str>) -> Option<String> {
        flag.filter(|k| !k.is_empty())
            .map(str::to_owned)
            .or_else(|| self.api_key.clone().filter(|k| !k.is_empty()))
    }
}
