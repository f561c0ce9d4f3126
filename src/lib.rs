//! A single-threaded, synchronous, I/O-agnostic IRCv3 client protocol engine.
//!
//! An embedder owns the socket; this crate owns everything that has to be true about the
//! session once the bytes arrive. [`Engine::push`] feeds one line in, the `Engine`'s command
//! methods (`join`, `privmsg`, `mode`, ...) issue one line out, and the registered [`Events`]
//! callbacks fire synchronously on the caller's thread as `push` dispatches each line. Nothing
//! here spawns a task or owns a socket; `std::io::Write` is the only I/O this crate performs.

mod address_book;
mod batch;
mod capability;
mod channel;
mod dispatcher;
mod engine;
mod error;
mod events;
mod identity;
mod isupport;
mod metadata;
mod outgoing;
mod sasl;
mod user;
mod whois;

pub use address_book::AddressBook;
pub use batch::{Batch, BatchFramer, Unit};
pub use capability::{CapabilityNegotiator, NegotiationState};
pub use channel::Channel;
pub use dispatcher::MessageMetadata;
pub use engine::Engine;
pub use error::{EngineError, ErrorKind, Result};
pub use events::{Events, LuserKind, MessageKind};
pub use identity::Identity;
pub use isupport::{CaseMapping, IsupportStore, NewlyObserved};
pub use metadata::{MetadataStore, MetadataTarget, MetadataValue};
pub use sasl::{External, Plain, SaslDriver, SaslMechanism, SaslOutcome, SaslStep};
pub use user::User;
pub use whois::{WhoisAggregator, WhoisResponse};

pub use relaychat_proto as proto;
