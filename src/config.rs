use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_BASE_URL, DEFAULT_LAUNCHPAD_URL};
use crate::error::{BcqError, Result};

/// Layered settings: built-in defaults, then `config.toml`, then `BCQ_*`
/// environment variables. The completion cache location is deliberately
/// absent; it is resolved from the environment alone.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AccountConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_launchpad_url")]
    pub launchpad_url: String,
    /// Identity used for `me`.
    #[serde(default)]
    pub user_id: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            access_token: String::new(),
            base_url: default_base_url(),
            launchpad_url: default_launchpad_url(),
            user_id: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age(),
            refresh_timeout_secs: default_refresh_timeout(),
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_launchpad_url() -> String {
    DEFAULT_LAUNCHPAD_URL.into()
}

fn default_max_age() -> u64 {
    3600
}

fn default_refresh_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Load without validating; offline commands (`url`, `completion status`)
    /// work with an empty account section.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("BCQ_").split("__"))
            .extract()
            .map_err(|e| BcqError::Config(e.to_string()))
    }

    /// Settings a network-bound command cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.account.id.is_empty() {
            return Err(BcqError::Config(
                "account.id is required (set in config or BCQ_ACCOUNT__ID env var)".into(),
            ));
        }
        if self.account.access_token.is_empty() {
            return Err(BcqError::Config(
                "account.access_token is required (set in config or BCQ_ACCOUNT__ACCESS_TOKEN env var)"
                    .into(),
            ));
        }
        if self.cache.refresh_timeout_secs == 0 {
            return Err(BcqError::Config(
                "cache.refresh_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn user_id(&self) -> Option<String> {
        Some(self.account.user_id.clone()).filter(|id| !id.is_empty())
    }

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|xdg| !xdg.is_empty())
            .map(|xdg| PathBuf::from(xdg).join("bcq"))
            .or_else(|| {
                directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config").join("bcq"))
            })
    }

    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = format!(
            r#"[account]
id = ""            # or set BCQ_ACCOUNT__ID
access_token = ""  # or set BCQ_ACCOUNT__ACCESS_TOKEN
base_url = "{}"
launchpad_url = "{}"
user_id = ""       # your person ID, used for "me"

[cache]
max_age_secs = {}
refresh_timeout_secs = {}
"#,
            DEFAULT_BASE_URL,
            DEFAULT_LAUNCHPAD_URL,
            default_max_age(),
            default_refresh_timeout()
        );

        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}
