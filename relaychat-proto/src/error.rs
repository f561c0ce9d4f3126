//! Protocol-level parse errors.

use thiserror::Error;

/// A `Result` type for protocol-level parsing.
pub type Result<T> = ::std::result::Result<T, MessageParseError>;

/// Errors that occur when parsing a single line into a [`crate::Message`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MessageParseError {
    /// The line was empty once CR/LF was stripped.
    #[error("empty message")]
    EmptyMessage,

    /// The command/verb token was missing.
    #[error("invalid command")]
    InvalidCommand,

    /// A mode string could not be parsed.
    #[error("invalid mode string: {string}")]
    InvalidModeString {
        /// The offending mode string.
        string: String,
        /// The specific cause.
        #[source]
        cause: ModeParseError,
    },

    /// A CAP/METADATA/BATCH subcommand was not one of the recognized tokens.
    #[error("invalid {cmd} subcommand: {sub}")]
    InvalidSubcommand {
        /// The command whose subcommand was invalid.
        cmd: &'static str,
        /// The invalid subcommand text.
        sub: String,
    },
}

/// Errors that occur while parsing a mode-change string (see `mode` module).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ModeParseError {
    /// A modifier other than `+`/`-` was used.
    #[error("invalid mode modifier: {modifier}")]
    InvalidModeModifier {
        /// The invalid modifier character.
        modifier: char,
    },

    /// The mode string did not start with `+` or `-`.
    #[error("missing mode modifier")]
    MissingModeModifier,

    /// An A/B mode, or a C mode being set, ran out of arguments to consume.
    #[error("not enough arguments for mode string")]
    NotEnoughArguments,
}
