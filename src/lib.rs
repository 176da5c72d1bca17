//! owlcore: message index and asynchronous disk logging for a terminal chat
//! client.
//!
//! Protocol backends hand [`message::MessageEntity`] values to the client.
//! Each one is appended to the [`index::MessageIndex`] for display and,
//! independently, offered to the [`log::MessageLogger`], which decides
//! whether and where to log it and queues the writes on a dedicated worker
//! thread ([`log::LogWriter`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod filter;
pub mod index;
pub mod log;
pub mod logging;
pub mod message;
