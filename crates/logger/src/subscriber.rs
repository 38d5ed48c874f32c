use std::{env::var, str::FromStr};

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log lines written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl LogFormat {
    /// Read the format from `RUST_LOG_FORMAT`, falling back to compact output.
    pub fn from_env() -> Self {
        var("RUST_LOG_FORMAT")
            .ok()
            .and_then(|raw| {
                raw.parse()
                    .inspect_err(|error| eprintln!("Ignoring RUST_LOG_FORMAT: {error}"))
                    .ok()
            })
            .unwrap_or_default()
    }
}

/// Initialize tracing at INFO with the format taken from the environment.
pub fn init_tracing() {
    init_tracing_with(LevelFilter::INFO, LogFormat::from_env());
}

/// Initialize the global subscriber.
///
/// `level` is only the default directive: `RUST_LOG` still wins when set.
/// Calling this twice is harmless, the second call only logs a warning.
pub fn init_tracing_with(level: LevelFilter, format: LogFormat) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("Tracing subscriber already installed: {error}");
    }
}
