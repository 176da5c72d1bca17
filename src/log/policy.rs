//! Logging policy: whether a message is logged, where, and as what text.
//!
//! Two implementations sit behind [`LoggingPolicy`]:
//! - [`NativePolicy`]: built-in rules driven by [`LoggingConfig`]
//! - [`HostPolicy`]: delegates naming and rendering to an [`ExtensionHost`],
//!   which may also override the decision
//!
//! The active one is picked from `logging.policy` by [`select_policy`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::config::{expand_home, DirectionRestriction, LoggingConfig, PolicyMode};
use crate::filter::{Filter, FilterError};
use crate::message::{is_valid_time_format, Direction, LoginEvent, MessageEntity};

/// Name of the aggregate personal log file.
pub const AGGREGATE_LOG: &str = "all";

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Logging configuration with the log filter compiled.
#[derive(Debug, Clone)]
pub struct LogRules {
    config: LoggingConfig,
    filter: Option<Filter>,
}

impl LogRules {
    /// Compile the configured log filter, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if `log_filter` does not parse.
    pub fn new(mut config: LoggingConfig) -> Result<Self, FilterError> {
        if !is_valid_time_format(&config.time_format) {
            warn!(format = %config.time_format, "invalid log time format, using default");
            config.time_format = LoggingConfig::default().time_format;
        }
        let filter = match config.log_filter.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => Some(Filter::parse(expr)?),
            _ => None,
        };
        Ok(Self { config, filter })
    }

    /// The underlying configuration.
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// The compiled log filter.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

/// Outcome of evaluating a message against the policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingDecision {
    /// Whether the message is logged at all.
    pub accept: bool,
    /// Files the rendered content is appended to.
    pub filenames: Vec<PathBuf>,
}

impl LoggingDecision {
    /// Do not log.
    pub fn reject() -> Self {
        Self::default()
    }

    /// Log to `filenames`.
    pub fn accept(filenames: Vec<PathBuf>) -> Self {
        Self {
            accept: true,
            filenames,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy trait
// ---------------------------------------------------------------------------

/// Decides whether and where a message is logged.
pub trait LoggingPolicy: Send + Sync {
    /// Whether `msg` should be logged.
    fn should_log(&self, msg: &MessageEntity, rules: &LogRules) -> bool;

    /// Files `msg` is appended to.
    fn filenames(&self, msg: &MessageEntity, rules: &LogRules) -> Vec<PathBuf>;

    /// Text appended for `msg`.
    fn render(&self, msg: &MessageEntity, rules: &LogRules) -> String;
}

/// Built-in rule evaluation.
///
/// First match wins:
/// 1. the log filter matches: log
/// 2. login/logout while login logging is off: skip
/// 3. direction restriction conflicts: skip
/// 4. protocol rules for personal and class logging
pub fn native_should_log(msg: &MessageEntity, rules: &LogRules) -> bool {
    if rules.filter().is_some_and(|f| f.matches(msg)) {
        return true;
    }

    let config = rules.config();
    if !config.log_logins && msg.is_loginout() {
        return false;
    }

    match (config.direction, msg.direction()) {
        (DirectionRestriction::In, Direction::Out) | (DirectionRestriction::Out, Direction::In) => {
            return false;
        }
        _ => {}
    }

    if msg.protocol().is_class_based() {
        if msg.is_personal() {
            config.logging
        } else {
            config.class_logging
        }
    } else if msg.is_private() || msg.is_loginout() {
        config.logging
    } else {
        config.class_logging
    }
}

/// Replace characters that would escape the log directory.
fn file_component(name: &str) -> String {
    if name.is_empty() {
        return "unknown".to_owned();
    }
    name.replace(|c: char| c == '/' || c == '\0', "_")
}

/// Personal log files for `peer`: its own file plus the aggregate.
pub fn personal_log_files(log_dir: &Path, peer: &str) -> Vec<PathBuf> {
    vec![log_dir.join(file_component(peer)), log_dir.join(AGGREGATE_LOG)]
}

// ---------------------------------------------------------------------------
// Native
// ---------------------------------------------------------------------------

/// Rule-based policy with built-in file naming and rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePolicy;

impl LoggingPolicy for NativePolicy {
    fn should_log(&self, msg: &MessageEntity, rules: &LogRules) -> bool {
        native_should_log(msg, rules)
    }

    fn filenames(&self, msg: &MessageEntity, rules: &LogRules) -> Vec<PathBuf> {
        let config = rules.config();
        let personal = if msg.protocol().is_class_based() {
            msg.is_personal() || msg.is_loginout()
        } else {
            msg.is_private() || msg.is_loginout()
        };
        if personal {
            personal_log_files(&config.log_dir(), config.short_address(msg.peer()))
        } else {
            let group = if msg.class().is_empty() {
                msg.recipient()
            } else {
                msg.class()
            };
            vec![config.class_log_dir().join(file_component(group))]
        }
    }

    fn render(&self, msg: &MessageEntity, rules: &LogRules) -> String {
        let time = msg.time().format(&rules.config().time_format);
        match msg.login() {
            LoginEvent::Login => return format!("{} logged in at {time}\n", msg.sender()),
            LoginEvent::Logout => return format!("{} logged out at {time}\n", msg.sender()),
            LoginEvent::None => {}
        }
        if msg.protocol().is_class_based() {
            format!(
                "Class: {} Instance: {}\nTime: {time} Host: \nFrom: {} <{}>\n\n{}\n\n",
                msg.class(),
                msg.instance(),
                msg.sender(),
                msg.recipient(),
                msg.body()
            )
        } else {
            format!(
                "From: {} <{}>\nTime: {time}\n\n{}\n\n",
                msg.sender(),
                msg.recipient(),
                msg.body()
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Host-delegated
// ---------------------------------------------------------------------------

/// An extension/scripting host that can take over message logging.
pub trait ExtensionHost: Send + Sync {
    /// Override the logging decision. `None` defers to the built-in rules.
    fn should_log(&self, _msg: &MessageEntity) -> Option<bool> {
        None
    }

    /// Newline-delimited list of target files.
    fn log_filenames(&self, msg: &MessageEntity) -> String;

    /// Log text for `msg`.
    fn render_log(&self, msg: &MessageEntity) -> String;
}

/// Split a host-supplied filename list, dropping empty lines and expanding
/// `~`. Names are otherwise kept byte for byte, including spaces.
pub fn parse_filename_list(list: &str) -> Vec<PathBuf> {
    list.lines()
        .filter(|line| !line.is_empty())
        .map(expand_home)
        .collect()
}

/// Policy that hands naming and rendering to an [`ExtensionHost`].
#[derive(Clone)]
pub struct HostPolicy {
    host: Arc<dyn ExtensionHost>,
}

impl std::fmt::Debug for HostPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostPolicy").finish_non_exhaustive()
    }
}

impl HostPolicy {
    /// Delegate to `host`.
    pub fn new(host: Arc<dyn ExtensionHost>) -> Self {
        Self { host }
    }
}

impl LoggingPolicy for HostPolicy {
    fn should_log(&self, msg: &MessageEntity, rules: &LogRules) -> bool {
        match self.host.should_log(msg) {
            Some(decision) => {
                trace!(id = msg.id(), decision, "host overrode logging decision");
                decision
            }
            None => native_should_log(msg, rules),
        }
    }

    fn filenames(&self, msg: &MessageEntity, _rules: &LogRules) -> Vec<PathBuf> {
        parse_filename_list(&self.host.log_filenames(msg))
    }

    fn render(&self, msg: &MessageEntity, _rules: &LogRules) -> String {
        self.host.render_log(msg)
    }
}

/// Build the policy named by `mode`.
///
/// Falls back to [`NativePolicy`] when host mode is configured but no host
/// is attached.
pub fn select_policy(
    mode: PolicyMode,
    host: Option<Arc<dyn ExtensionHost>>,
) -> Box<dyn LoggingPolicy> {
    match (mode, host) {
        (PolicyMode::Host, Some(host)) => Box::new(HostPolicy::new(host)),
        (PolicyMode::Host, None) => {
            warn!("host logging policy configured without a host, using native rules");
            Box::new(NativePolicy)
        }
        (PolicyMode::Native, _) => Box::new(NativePolicy),
    }
}
