pub mod config;
pub mod logging;

pub const APP_NAME: &str = "linkpin";

pub use config::{
    AccessConfig, BotConfig, ConfigError, LinksConfig, ResetConfig, ScopeConfig, TelegramConfig,
};
