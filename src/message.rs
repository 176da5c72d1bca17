//! Message entities as delivered by protocol backends.
//!
//! A [`MessageEntity`] carries immutable protocol metadata (id, direction,
//! classification flags, addressing) plus two pieces of mutable state owned
//! by the message index: the soft-delete mark and a lazily computed display
//! format.

use std::cell::OnceCell;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Message identifier assigned by the caller.
pub type MessageId = u64;

/// Which way a message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from a remote party.
    In,
    /// Sent by the local user.
    Out,
    /// Locally generated (admin notices, loopback).
    None,
}

impl Direction {
    /// Lowercase name used by filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::None => "none",
        }
    }
}

/// Protocol backend a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Class/instance based multi-recipient messaging.
    Zephyr,
    /// AOL instant messenger.
    Aim,
    /// XMPP.
    Jabber,
    /// Internet relay chat.
    Irc,
    /// Local loopback messages.
    Loopback,
    /// Client-generated admin messages.
    Admin,
}

impl Protocol {
    /// Lowercase name used by filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zephyr => "zephyr",
            Self::Aim => "aim",
            Self::Jabber => "jabber",
            Self::Irc => "irc",
            Self::Loopback => "loopback",
            Self::Admin => "admin",
        }
    }

    /// Whether this protocol addresses traffic by class rather than by
    /// conversation, so personal and class logging are decided separately.
    pub fn is_class_based(self) -> bool {
        matches!(self, Self::Zephyr)
    }
}

/// Presence notification carried by a message, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginEvent {
    /// Ordinary traffic.
    #[default]
    None,
    /// The sender logged in.
    Login,
    /// The sender logged out.
    Logout,
}

impl LoginEvent {
    /// Lowercase name used by filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Login => "login",
            Self::Logout => "logout",
        }
    }
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

/// Global rendering state that message display formats depend on.
///
/// When this changes the cached formats held by the index must be
/// invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatContext {
    /// chrono format string for the timestamp column.
    pub time_format: String,
}

/// Timestamp format used when none, or an invalid one, is given.
const DEFAULT_DISPLAY_TIME_FORMAT: &str = "%H:%M";

impl FormatContext {
    /// Build a context, replacing an invalid `time_format` with the default.
    pub fn new(time_format: impl Into<String>) -> Self {
        let time_format = time_format.into();
        if is_valid_time_format(&time_format) {
            Self { time_format }
        } else {
            Self::default()
        }
    }
}

impl Default for FormatContext {
    fn default() -> Self {
        Self {
            time_format: DEFAULT_DISPLAY_TIME_FORMAT.to_owned(),
        }
    }
}

/// Whether chrono accepts every specifier in `format`.
///
/// Formatting a timestamp with a rejected specifier panics inside
/// `format!`, so format strings from configuration go through this first.
pub fn is_valid_time_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A single incoming or outgoing conversational message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEntity {
    id: MessageId,
    direction: Direction,
    protocol: Protocol,
    #[serde(default)]
    login: LoginEvent,
    #[serde(default)]
    personal: bool,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    recipient: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    instance: String,
    #[serde(default)]
    body: String,
    #[serde(default = "Utc::now")]
    time: DateTime<Utc>,

    #[serde(skip)]
    deleted: bool,
    #[serde(skip)]
    format: OnceCell<String>,
}

impl MessageEntity {
    /// Create a message with empty addressing, timestamped now.
    pub fn new(id: MessageId, direction: Direction, protocol: Protocol) -> Self {
        Self {
            id,
            direction,
            protocol,
            login: LoginEvent::None,
            personal: false,
            private: false,
            sender: String::new(),
            recipient: String::new(),
            class: String::new(),
            instance: String::new(),
            body: String::new(),
            time: Utc::now(),
            deleted: false,
            format: OnceCell::new(),
        }
    }

    /// Set the sender.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Set the recipient.
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    /// Set class and instance.
    pub fn with_class(mut self, class: impl Into<String>, instance: impl Into<String>) -> Self {
        self.class = class.into();
        self.instance = instance.into();
        self
    }

    /// Set the message body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the timestamp.
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Mark as personal (one-to-one) traffic.
    pub fn personal(mut self) -> Self {
        self.personal = true;
        self
    }

    /// Mark as private traffic.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Attach a presence notification.
    pub fn with_login(mut self, login: LoginEvent) -> Self {
        self.login = login;
        self
    }

    /// Caller-assigned identifier.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Direction of travel.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Originating protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Presence notification, if any.
    pub fn login(&self) -> LoginEvent {
        self.login
    }

    /// True for login and logout notifications.
    pub fn is_loginout(&self) -> bool {
        self.login != LoginEvent::None
    }

    /// One-to-one traffic.
    pub fn is_personal(&self) -> bool {
        self.personal
    }

    /// Private traffic.
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Sender address.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Recipient address.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Message class.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Message instance.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Message text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Timestamp.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// The other party of a conversation: the sender of inbound traffic,
    /// the recipient of everything else.
    pub fn peer(&self) -> &str {
        match self.direction {
            Direction::In => &self.sender,
            Direction::Out | Direction::None => &self.recipient,
        }
    }

    /// Whether the soft-delete mark is set.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }

    /// Display representation, computed on first access and cached until
    /// [`invalidate_format`](Self::invalidate_format).
    pub fn formatted(&self, ctx: &FormatContext) -> &str {
        self.format.get_or_init(|| self.render_display(ctx))
    }

    /// Whether a cached display format is held.
    pub fn has_cached_format(&self) -> bool {
        self.format.get().is_some()
    }

    /// Drop the cached display format.
    pub fn invalidate_format(&mut self) {
        self.format.take();
    }

    fn render_display(&self, ctx: &FormatContext) -> String {
        let time_format = if is_valid_time_format(&ctx.time_format) {
            ctx.time_format.as_str()
        } else {
            DEFAULT_DISPLAY_TIME_FORMAT
        };
        let time = self.time.format(time_format);
        if self.protocol.is_class_based() && !self.personal {
            format!(
                "{time} {} / {} / {}: {}",
                self.class, self.instance, self.sender, self.body
            )
        } else {
            format!("{time} {} -> {}: {}", self.sender, self.recipient, self.body)
        }
    }
}
