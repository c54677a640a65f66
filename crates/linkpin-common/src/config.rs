use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = ".linkpin/config.toml";
const ENTRIES_FILE: &str = "links.json";
const PIN_FILE: &str = "pin.json";
const OFFSET_FILE: &str = "offset.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub reset: ResetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Identity of the single administrator allowed to reset and to remove any entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    pub admin_id: Option<i64>,
}

/// Restricts the command surface to one discussion thread of a forum chat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub topic_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Blank disables the rule.
    #[serde(default = "default_allowed_prefix")]
    pub allowed_prefix: Option<String>,
    #[serde(default = "default_unknown_submitter")]
    pub unknown_submitter: String,
    #[serde(default = "default_confirmation_ttl_secs")]
    pub confirmation_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reset_schedule")]
    pub schedule: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            allowed_prefix: default_allowed_prefix(),
            unknown_submitter: default_unknown_submitter(),
            confirmation_ttl_secs: default_confirmation_ttl_secs(),
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_reset_schedule(),
            timezone: default_timezone(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".linkpin")
            .join("data");

        Self {
            data_dir,
            log_level: "info".to_string(),
            telegram: TelegramConfig::default(),
            access: AccessConfig::default(),
            scope: ScopeConfig::default(),
            links: LinksConfig::default(),
            reset: ResetConfig::default(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    2
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_allowed_prefix() -> Option<String> {
    Some("https://x.com".to_string())
}

fn default_unknown_submitter() -> String {
    "unknown".to_string()
}

fn default_confirmation_ttl_secs() -> u64 {
    5
}

fn default_reset_schedule() -> String {
    "0 0 7 * * *".to_string()
}

fn default_timezone() -> String {
    "Asia/Ho_Chi_Minh".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize default config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("config has invalid value: {0}")]
    ValidationFailed(String),
}

impl BotConfig {
    pub fn resolve_path() -> PathBuf {
        if let Ok(path) = env::var("LINKPIN_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, raw).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn load_or_create() -> Result<(Self, PathBuf, bool), ConfigError> {
        let path = Self::resolve_path();
        if path.exists() {
            let cfg = Self::load(&path)?;
            return Ok((cfg, path, false));
        }

        let cfg = Self::default();
        cfg.save(&path)?;
        Ok((cfg, path, true))
    }

    /// Bot token from `LINKPIN_BOT_TOKEN`, then `BOT_TOKEN`, then the config file.
    pub fn resolve_token(&self) -> Option<String> {
        ["LINKPIN_BOT_TOKEN", "BOT_TOKEN"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .chain(self.telegram.token.clone())
            .map(|token| token.trim().to_string())
            .find(|token| !token.is_empty())
    }

    pub fn entries_path(&self) -> PathBuf {
        self.data_dir.join(ENTRIES_FILE)
    }

    pub fn pin_path(&self) -> PathBuf {
        self.data_dir.join(PIN_FILE)
    }

    /// Next Telegram update offset, so a restart never replays handled commands.
    pub fn offset_path(&self) -> PathBuf {
        self.data_dir.join(OFFSET_FILE)
    }

    /// The prefix rule, or `None` when it is absent or blank.
    pub fn allowed_prefix(&self) -> Option<&str> {
        self.links
            .allowed_prefix
            .as_deref()
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
    }

    pub fn reset_timezone(&self) -> Result<Tz, ConfigError> {
        Tz::from_str(self.reset.timezone.trim()).map_err(|_| {
            ConfigError::ValidationFailed(format!(
                "reset.timezone is not a known IANA zone: {}",
                self.reset.timezone
            ))
        })
    }

    pub fn reset_schedule(&self) -> Result<cron::Schedule, ConfigError> {
        cron::Schedule::from_str(self.reset.schedule.trim()).map_err(|err| {
            ConfigError::ValidationFailed(format!(
                "reset.schedule is not a valid cron expression ({}): {err}",
                self.reset.schedule
            ))
        })
    }

    pub fn validate_and_prepare(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "log_level cannot be empty".to_string(),
            ));
        }
        if self.telegram.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "telegram.api_base cannot be empty".to_string(),
            ));
        }
        if self.links.confirmation_ttl_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "links.confirmation_ttl_secs must be positive".to_string(),
            ));
        }
        if self.links.unknown_submitter.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "links.unknown_submitter cannot be empty".to_string(),
            ));
        }
        self.reset_timezone()?;
        self.reset_schedule()?;
        fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::WriteFailed {
            path: self.data_dir.clone(),
            source,
        })?;
        Ok(())
    }
}
