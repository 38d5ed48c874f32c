use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};

use crate::monitoring::scheduler::DEFAULT_CHANNEL_CAPACITY;
use crate::monitoring::types::{Check, Target};
use crate::monitoring::validation::{self, ValidationError};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    ReadFailed {
        path: path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {message}", path.display())]
    ParseFailed { path: path::PathBuf, message: String },

    #[error("no config path given and neither $XDG_CONFIG_HOME nor $HOME is set")]
    ConfigPathUnavailable,

    #[error("unsupported config version {0} (expected {expected})", expected = CONFIG_VERSION)]
    UnsupportedVersion(u32),

    #[error("no monitor targets configured")]
    NoMonitors,

    #[error("monitor #{index} ({url}): {source}")]
    InvalidMonitor {
        index: usize,
        url: String,
        #[source]
        source: ValidationError,
    },
}

/// On-disk shape of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version", alias = "Version")]
    pub version: u32,

    /// CSV result log path
    #[serde(default, alias = "Log", skip_serializing_if = "Option::is_none")]
    pub log: Option<path::PathBuf>,

    /// Dashboard listen address
    #[serde(default, alias = "HTTP", skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default, alias = "Monitor")]
    pub monitor: Vec<MonitorConfig>,
}

/// One `[[monitor]]` entry; durations are in (fractional) seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(alias = "URL")]
    pub url: String,

    #[serde(alias = "Timeout")]
    pub timeout: f64,

    #[serde(alias = "Interval")]
    pub interval: f64,

    #[serde(default, alias = "Checks")]
    pub checks: Vec<Check>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// Get default config path ($XDG_CONFIG_HOME/httpmonitor/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("httpmonitor/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Configuration State:")?;
        write_title_1(f, "Outputs")?;
        write_1(f, "Version", &self.version)?;
        write_1(
            f,
            "Log file",
            &self.log_path().map_or("(disabled)".into(), |p| p.display().to_string()),
        )?;
        write_1(f, "HTTP listen address", &self.http_addr().unwrap_or("(disabled)"))?;
        write_1(f, "Channel capacity", &self.channel_capacity)?;
        write_title_1(f, "Monitor targets")?;
        for monitor in &self.monitor {
            write_2(
                f,
                &monitor.url,
                &format_args!(
                    "every {}s timeout={}s ({} checks)",
                    monitor.interval,
                    monitor.timeout,
                    monitor.checks.len()
                ),
            )?;
        }

        Ok(())
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// Uses `optional_path` when given, otherwise
    /// `$XDG_CONFIG_HOME/httpmonitor/config.toml`. Files ending in `.json` are
    /// parsed as JSON, everything else as TOML.
    ///
    /// ```no_run
    /// let cfg = httpmonitor::config::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), httpmonitor::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = match optional_path {
            Some(path) => path.as_ref().to_path_buf(),
            None => default_config_path()?,
        };

        let raw_string = fs::read_to_string(&config_path)
            .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;

        let config = Self::parse(&raw_string, Format::of(&config_path))
            .map_err(|message| ConfigError::ParseFailed { path: config_path, message })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML configuration text without validating it
    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        Self::parse(raw, Format::Toml)
    }

    /// Parse JSON configuration text without validating it
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        Self::parse(raw, Format::Json)
    }

    fn parse(raw: &str, format: Format) -> Result<Self, String> {
        match format {
            Format::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
        }
    }

    /// Check every monitor entry so bad settings never reach the engine
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        self.targets().map(|_| ())
    }

    /// Build the engine's targets from the monitor entries
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        if self.monitor.is_empty() {
            return Err(ConfigError::NoMonitors);
        }

        self.monitor
            .iter()
            .enumerate()
            .map(|(index, monitor)| {
                monitor.to_target().map_err(|source| ConfigError::InvalidMonitor {
                    index,
                    url: monitor.url.clone(),
                    source,
                })
            })
            .collect()
    }

    /// CSV log path, with an empty string meaning "disabled"
    pub fn log_path(&self) -> Option<&path::Path> {
        self.log.as_deref().filter(|p| !p.as_os_str().is_empty())
    }

    /// Dashboard address, with an empty string meaning "disabled"
    pub fn http_addr(&self) -> Option<&str> {
        self.http.as_deref().filter(|addr| !addr.is_empty())
    }
}

impl MonitorConfig {
    pub fn to_target(&self) -> Result<Target, ValidationError> {
        let target = Target {
            url: self.url.clone(),
            timeout: validation::seconds_to_duration("timeout", self.timeout)?,
            interval: validation::seconds_to_duration("interval", self.interval)?,
            checks: self.checks.clone(),
        };

        validation::validate_target(&target)?;
        Ok(target)
    }
}
