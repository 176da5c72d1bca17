//! Configuration loading and validation.
//!
//! The client reads a single human-owned `config.toml`. Only the
//! `[logging]` table is consumed by this crate; unknown tables are ignored
//! so the file can be shared with the rest of the client.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Message logging switches.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which traffic direction is eligible for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionRestriction {
    /// Log both directions.
    #[default]
    Both,
    /// Only inbound traffic.
    In,
    /// Only outbound traffic.
    Out,
}

/// Which logging policy implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Built-in rules, filenames and rendering.
    #[default]
    Native,
    /// Delegate to the attached extension host.
    Host,
}

/// Message logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log personal (one-to-one) traffic.
    #[serde(default)]
    pub logging: bool,

    /// Log class (group) traffic.
    #[serde(default)]
    pub class_logging: bool,

    /// Log login/logout notifications.
    #[serde(default)]
    pub log_logins: bool,

    /// Direction restriction.
    #[serde(default)]
    pub direction: DirectionRestriction,

    /// Filter expression that forces logging when it matches.
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Directory for personal logs. A leading `~` is expanded.
    #[serde(default = "default_log_path")]
    pub log_path: String,

    /// Directory for class logs. A leading `~` is expanded.
    #[serde(default = "default_class_log_path")]
    pub class_log_path: String,

    /// Realm stripped from addresses when naming personal log files.
    #[serde(default)]
    pub local_realm: Option<String>,

    /// Policy implementation.
    #[serde(default)]
    pub policy: PolicyMode,

    /// chrono format string used for timestamps in log files.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logging: false,
            class_logging: false,
            log_logins: false,
            direction: DirectionRestriction::default(),
            log_filter: None,
            log_path: default_log_path(),
            class_log_path: default_class_log_path(),
            local_realm: None,
            policy: PolicyMode::default(),
            time_format: default_time_format(),
        }
    }
}

impl LoggingConfig {
    /// Personal log directory with `~` expanded.
    pub fn log_dir(&self) -> PathBuf {
        expand_home(&self.log_path)
    }

    /// Class log directory with `~` expanded.
    pub fn class_log_dir(&self) -> PathBuf {
        expand_home(&self.class_log_path)
    }

    /// Strip the configured local realm from `address`, if present.
    pub fn short_address<'a>(&self, address: &'a str) -> &'a str {
        let Some(realm) = self.local_realm.as_deref() else {
            return address;
        };
        match address.rsplit_once('@') {
            Some((user, r)) if r.eq_ignore_ascii_case(realm) => user,
            _ => address,
        }
    }
}

// Default value functions for serde

fn default_log_path() -> String {
    "~/zlog/people".to_owned()
}
fn default_class_log_path() -> String {
    "~/zlog/class".to_owned()
}
fn default_time_format() -> String {
    "%a %b %e %H:%M:%S %Y".to_owned()
}

/// Expand a leading `~` or `~/` against the home directory.
///
/// Other paths, including `~user` forms, are returned unchanged. If the
/// home directory cannot be determined the path is returned as written.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/") {
        rest
    } else {
        return PathBuf::from(path);
    };
    match directories::BaseDirs::new() {
        Some(dirs) if rest.is_empty() => dirs.home_dir().to_path_buf(),
        Some(dirs) => dirs.home_dir().join(rest),
        None => PathBuf::from(path),
    }
}

/// Load the configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.owlcore/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".owlcore"))
}
