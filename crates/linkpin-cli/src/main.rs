use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use linkpin_bot::{CommandDispatcher, DispatcherConfig, PollLoop, ResetSchedule};
use linkpin_common::{APP_NAME, BotConfig, logging};
use linkpin_registry::{JsonStateStore, Registry, RegistryPolicy, ResetOrigin, Summary, format_summary};
use linkpin_telegram::TelegramGateway;
use tracing::{info, warn};

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(3);
const RESET_OFFLINE_NOTE: &str =
    "note: a running bot keeps its own copy of the list and overwrites this reset on its next change; stop it first";

#[derive(Debug, Parser)]
#[command(name = "linkpin", about = "Telegram link collector with a pinned daily summary", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate local setup, generate default config if missing, and check the bot token.
    Doctor,
    /// Run the bot: long-poll Telegram and serve commands in the link thread.
    Run {
        /// Process a single poll cycle, flush pending deletions and exit.
        #[arg(long)]
        once: bool,
    },
    /// Print the saved links as they would be pinned.
    List,
    /// Clear the saved links. Stop a running bot first: it would write its own list back.
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Doctor) => doctor(),
        Some(Command::Run { once }) => run(once),
        Some(Command::List) => list(),
        Some(Command::Reset) => reset(),
        None => {
            println!("{APP_NAME} ready.");
            println!("Run `linkpin doctor` to generate and validate local config.");
            Ok(())
        }
    }
}

fn load_initialized_config() -> Result<BotConfig> {
    let (config, _, _) = BotConfig::load_or_create()?;
    config.validate_and_prepare()?;
    logging::init(&config.log_level);
    Ok(config)
}

fn open_registry(config: &BotConfig) -> Result<Registry> {
    let store = Arc::new(JsonStateStore::new(
        config.entries_path(),
        config.pin_path(),
        config.offset_path(),
    ));
    Ok(Registry::open(store, registry_policy(config)?))
}

fn registry_policy(config: &BotConfig) -> Result<RegistryPolicy> {
    Ok(RegistryPolicy {
        allowed_prefix: config.allowed_prefix().map(str::to_string),
        admin_id: config.access.admin_id,
        unknown_submitter: config.links.unknown_submitter.trim().to_string(),
        timezone: config.reset_timezone()?,
    })
}

fn gateway(config: &BotConfig) -> Result<TelegramGateway> {
    let token = config.resolve_token().ok_or_else(|| {
        anyhow!("telegram token missing: set LINKPIN_BOT_TOKEN, BOT_TOKEN or telegram.token")
    })?;
    TelegramGateway::with_api_base(
        &config.telegram.api_base,
        &token,
        config.telegram.request_timeout_ms,
    )
}

fn doctor() -> Result<()> {
    let (config, path, created) = BotConfig::load_or_create()?;
    config.validate_and_prepare()?;
    logging::init(&config.log_level);

    println!("config_path: {}", path.display());
    println!("config_created: {created}");
    println!("data_dir: {}", config.data_dir.display());
    println!("admin_id: {}", display_opt(config.access.admin_id));
    println!("topic_id: {}", display_opt(config.scope.topic_id));
    println!("allowed_prefix: {}", config.allowed_prefix().unwrap_or("(any)"));
    if let Some(schedule) = ResetSchedule::from_config(&config, Utc::now())? {
        println!("next_reset: {}", display_opt(schedule.next_due()));
    } else {
        println!("next_reset: disabled");
    }

    let me = gateway(&config)?
        .get_me()
        .context("telegram token check failed")?;
    println!("telegram_status: ok");
    println!("bot_id: {}", me.id);
    println!("bot_username: {}", me.username.as_deref().unwrap_or(&me.first_name));
    Ok(())
}

fn run(once: bool) -> Result<()> {
    let config = load_initialized_config()?;
    let gateway = gateway(&config)?;
    let me = gateway.get_me().context("telegram token check failed")?;
    info!(bot = %me.first_name, username = ?me.username, "connected to telegram");

    let registry = open_registry(&config)?;
    let dispatcher = CommandDispatcher::new(
        registry,
        gateway,
        DispatcherConfig {
            topic_id: config.scope.topic_id,
            confirmation_ttl: Duration::from_secs(config.links.confirmation_ttl_secs),
            bot_username: me.username.clone(),
        },
    );
    let reset = ResetSchedule::from_config(&config, Utc::now())?;
    if let Some(schedule) = &reset {
        info!(next = ?schedule.next_due(), "daily reset scheduled");
    }
    let mut poll_loop = PollLoop::new(dispatcher, reset, config.telegram.poll_timeout_secs);

    info!("bot running");
    loop {
        match poll_loop.run_cycle() {
            Ok(handled) if handled > 0 => info!(handled, "updates processed"),
            Ok(_) => {}
            Err(err) => {
                warn!(error = %format!("{err:#}"), "poll failed, backing off");
                if !once {
                    thread::sleep(POLL_ERROR_BACKOFF);
                }
            }
        }
        if once {
            break;
        }
    }

    let flushed = poll_loop.shutdown();
    info!(flushed, "bot stopped");
    Ok(())
}

fn list() -> Result<()> {
    let config = load_initialized_config()?;
    let registry = open_registry(&config)?;
    match format_summary(registry.entries()) {
        Summary::Empty => println!("no links saved"),
        Summary::Text(text) => println!("{text}"),
    }
    Ok(())
}

fn reset() -> Result<()> {
    let config = load_initialized_config()?;
    let mut registry = open_registry(&config)?;
    let cleared = registry.reset(ResetOrigin::Scheduled)?;
    eprintln!("{RESET_OFFLINE_NOTE}");
    println!("reset_cleared: {cleared}");
    Ok(())
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "(unset)".to_string(), |value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_follows_config() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = BotConfig::default();
        config.data_dir = tmp.path().to_path_buf();
        config.access.admin_id = Some(42);
        config.links.allowed_prefix = Some("  ".to_string());

        let policy = registry_policy(&config).expect("policy");
        assert_eq!(policy.admin_id, Some(42));
        assert_eq!(policy.allowed_prefix, None);
        assert_eq!(policy.unknown_submitter, "unknown");
    }

    #[test]
    fn registry_persists_under_data_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = BotConfig::default();
        config.data_dir = tmp.path().to_path_buf();

        let mut registry = open_registry(&config).expect("open");
        registry.add("alice", "https://x.com/a").expect("add");
        assert!(config.entries_path().exists());

        let reopened = open_registry(&config).expect("reopen");
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn reset_help_says_to_stop_the_bot_first() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let reset = cli.find_subcommand("reset").expect("reset subcommand");
        let about = reset.get_about().expect("about").to_string();
        assert!(about.contains("Stop a running bot first"));
        assert!(RESET_OFFLINE_NOTE.contains("stop it first"));
    }

    #[test]
    fn cli_parses_run_once() {
        let cli = Cli::try_parse_from(["linkpin", "run", "--once"]).expect("parse");
        assert!(matches!(cli.command, Some(Command::Run { once: true })));
    }
}
