//! Message logging: policy evaluation plus the asynchronous disk writer.
//!
//! [`MessageLogger`] is the single entry point. It asks the active
//! [`LoggingPolicy`] whether a message is logged and where, renders the text
//! once, and submits one append per target file to the [`LogWriter`].

pub mod policy;
pub mod writer;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::LoggingConfig;
use crate::filter::FilterError;
use crate::message::{Direction, MessageEntity, Protocol};

pub use policy::{
    select_policy, ExtensionHost, HostPolicy, LogRules, LoggingDecision, LoggingPolicy,
    NativePolicy,
};
pub use writer::{LogReport, LogTask, LogWriter, WriterError, WriterState};

/// Errors from building a [`MessageLogger`].
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// The configured log filter does not parse.
    #[error("invalid log filter: {0}")]
    Filter(#[from] FilterError),
}

/// Text logged for an outgoing message that could not be delivered.
///
/// A trailing blank line is always present, even when `text` lacks a final
/// newline.
pub fn outgoing_error_block(recipient: &str, text: &str) -> String {
    let mut block = format!("ERROR (owl): {recipient}\n{text}\n");
    if !text.ends_with('\n') {
        block.push('\n');
    }
    block
}

/// Routes messages through the logging policy into the writer.
pub struct MessageLogger {
    rules: LogRules,
    policy: Box<dyn LoggingPolicy>,
}

impl std::fmt::Debug for MessageLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLogger")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl MessageLogger {
    /// Build a logger around an explicit policy.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Filter`] if the configured log filter is invalid.
    pub fn new(config: LoggingConfig, policy: Box<dyn LoggingPolicy>) -> Result<Self, LoggerError> {
        Ok(Self {
            rules: LogRules::new(config)?,
            policy,
        })
    }

    /// Build a logger whose policy is chosen by `config.policy`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Filter`] if the configured log filter is invalid.
    pub fn from_config(
        config: LoggingConfig,
        host: Option<Arc<dyn ExtensionHost>>,
    ) -> Result<Self, LoggerError> {
        let policy = select_policy(config.policy, host);
        Self::new(config, policy)
    }

    /// Active rules.
    pub fn rules(&self) -> &LogRules {
        &self.rules
    }

    /// Evaluate `msg` without writing anything.
    pub fn decide(&self, msg: &MessageEntity) -> LoggingDecision {
        if !self.policy.should_log(msg, &self.rules) {
            return LoggingDecision::reject();
        }
        LoggingDecision::accept(self.policy.filenames(msg, &self.rules))
    }

    /// Log `msg` if the policy accepts it.
    ///
    /// `None` is a no-op. Returns the decision acted on.
    pub fn log_message(&self, writer: &LogWriter, msg: Option<&MessageEntity>) -> LoggingDecision {
        let Some(msg) = msg else {
            debug!("log_message called without a message");
            return LoggingDecision::reject();
        };

        let decision = self.decide(msg);
        if !decision.accept {
            trace!(id = msg.id(), "message not logged");
            return decision;
        }
        if decision.filenames.is_empty() {
            trace!(id = msg.id(), "message accepted with no target files");
            return decision;
        }

        let content = self.policy.render(msg, &self.rules);
        for filename in &decision.filenames {
            writer.submit_write(filename, &content);
        }
        trace!(id = msg.id(), files = decision.filenames.len(), "message logged");
        decision
    }

    /// Log a failed outgoing send to `recipient`.
    ///
    /// The attempt is run through the same policy as ordinary traffic, so
    /// suppression rules apply. When accepted the error block is appended to
    /// the recipient's personal log and to the aggregate log.
    pub fn log_outgoing_error(
        &self,
        writer: &LogWriter,
        recipient: &str,
        text: &str,
    ) -> LoggingDecision {
        let attempt = MessageEntity::new(0, Direction::Out, Protocol::Zephyr)
            .with_recipient(recipient)
            .with_body(text)
            .personal()
            .private();
        if !self.policy.should_log(&attempt, &self.rules) {
            trace!(recipient, "outgoing error not logged");
            return LoggingDecision::reject();
        }

        let config = self.rules.config();
        let short = config.short_address(recipient);
        let filenames = policy::personal_log_files(&config.log_dir(), short);
        let block = outgoing_error_block(short, text);
        for filename in &filenames {
            writer.submit_write(filename, &block);
        }
        debug!(recipient = short, "outgoing error logged");
        LoggingDecision::accept(filenames)
    }
}
