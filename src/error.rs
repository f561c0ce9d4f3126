//! Engine-level errors, surfaced to the embedder as data rather than propagated up through
//! `push`. See `events::Events::on_error`.
use std::fmt;

use thiserror::Error;

/// A `Result` type for fallible engine operations (mostly outgoing command construction, where a
/// domain invariant like `KICKLEN` is violated).
pub type Result<T> = ::std::result::Result<T, EngineError>;

/// The kind of condition an `onError` event reports. None of these are ever raised as a Rust
/// panic or propagated `Err` out of `push` — they are emitted as data per the engine's error
/// policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `723 ERR_NOPRIVS`.
    NoPrivs,
    /// `734 ERR_MONLISTFULL`.
    MonListFull,
    /// `422 ERR_NOMOTD`.
    NoMotd,
    /// `402 ERR_NOSUCHSERVER`.
    NoSuchServer,
    /// `481 ERR_NOPRIVILEGES`.
    NoPrivileges,
    /// A line could not be parsed, or parsed but made no sense in context.
    Malformed,
    /// An end-of-WHOIS numeric arrived with no matching accumulator.
    Unexpected,
    /// A verb or numeric this engine does not recognize.
    Unrecognized,
    /// An outgoing command violated a domain invariant (e.g. `KICKLEN`).
    BadUserInput,
    /// `766 ERR_KEYNOTSET`.
    KeyNotSet,
    /// `774 ERR_METADATASYNCLATER`.
    WaitAndRetry,
    /// `764 ERR_METADATALIMIT`.
    TooManySubs,
    /// A `FAIL` standard-reply line, of any family.
    StandardFail,
}

/// A single error event: what kind of thing went wrong, and a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct EngineError {
    /// The error's classification.
    pub kind: ErrorKind,
    /// A human-readable description, often the server's own trailing text.
    pub message: String,
}

impl EngineError {
    /// Constructs an error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> EngineError {
        EngineError { kind, message: message.into() }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
