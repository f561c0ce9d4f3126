//! The IRCv3 client protocol distilled: line parsing, mode strings, capability tokens,
//! numeric replies, and outgoing command formatting — all I/O-free.
//!
//! This crate has no notion of a connection, a socket, or state accumulated across multiple
//! lines. It turns one line of text into a typed value, or a typed value into one line of text.
//! Everything stateful (capability negotiation, address books, batches, WHOIS aggregation) lives
//! in the `relaychat` crate that depends on this one.

pub mod caps;
pub mod command;
pub mod error;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod response;

pub use caps::{Capability, NegotiationVersion, SUPPORTED_CAPABILITIES};
pub use command::{CapSubCommand, Command, MetadataSubCommand, MonitorSubCommand};
pub use error::{MessageParseError, ModeParseError};
pub use message::ParsedMessage;
pub use mode::{Mode, ModeCategory, ModeCategoryMap, ModeChange, Sign};
pub use prefix::Prefix;
pub use response::Response;
