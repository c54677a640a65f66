use tracing_subscriber::EnvFilter;

// Long polling makes the HTTP stack chatty at debug level.
const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn";

/// Installs the process-wide fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        return format!("info,{QUIET_DEPENDENCIES}");
    }
    format!("{level},{QUIET_DEPENDENCIES}")
}
