// Runtime configuration.
// Read from the environment; the token stays optional so its absence reaches callers as NO_TOKEN.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::paths;
use crate::error::{MoltError, Result};
use crate::github::GITHUB_API_BASE;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub log_level: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: GITHUB_API_BASE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            cache_dir: paths::cache_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        config.token = get("GITHUB_TOKEN");

        if let Some(url) = get("MOLTBOARD_GITHUB_API_URL") {
            config.api_base_url = url;
        }

        if let Some(secs) = get("MOLTBOARD_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                MoltError::Config(format!("MOLTBOARD_HTTP_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            if secs == 0 {
                return Err(MoltError::Config(
                    "MOLTBOARD_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(level) = get("MOLTBOARD_LOG") {
            config.log_level = level;
        }

        if let Some(dir) = get("MOLTBOARD_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}
