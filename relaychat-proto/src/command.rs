//! The outgoing commands this engine can format, and their wire serialization.
use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;

/// The `CAP` subcommand, sent or received during capability negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapSubCommand {
    /// List the server's available capabilities.
    LS,
    /// List the client's currently enabled capabilities.
    LIST,
    /// Request that capabilities be enabled.
    REQ,
    /// The server acknowledged a `REQ`.
    ACK,
    /// The server rejected a `REQ`.
    NAK,
    /// End capability negotiation.
    END,
    /// The server advertised a newly available capability.
    NEW,
    /// The server revoked a previously available capability.
    DEL,
}

impl CapSubCommand {
    /// Returns the wire token for this subcommand.
    pub fn as_str(self) -> &'static str {
        match self {
            CapSubCommand::LS => "LS",
            CapSubCommand::LIST => "LIST",
            CapSubCommand::REQ => "REQ",
            CapSubCommand::ACK => "ACK",
            CapSubCommand::NAK => "NAK",
            CapSubCommand::END => "END",
            CapSubCommand::NEW => "NEW",
            CapSubCommand::DEL => "DEL",
        }
    }
}

impl FromStr for CapSubCommand {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<CapSubCommand, Self::Err> {
        match s {
            "LS" => Ok(CapSubCommand::LS),
            "LIST" => Ok(CapSubCommand::LIST),
            "REQ" => Ok(CapSubCommand::REQ),
            "ACK" => Ok(CapSubCommand::ACK),
            "NAK" => Ok(CapSubCommand::NAK),
            "END" => Ok(CapSubCommand::END),
            "NEW" => Ok(CapSubCommand::NEW),
            "DEL" => Ok(CapSubCommand::DEL),
            _ => Err(MessageParseError::InvalidSubcommand { cmd: "CAP", sub: s.to_owned() }),
        }
    }
}

impl fmt::Display for CapSubCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `MONITOR` subcommand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorSubCommand {
    /// `MONITOR +target[,target2]*` — add targets to the monitor list.
    Add,
    /// `MONITOR -target[,target2]*` — remove targets from the monitor list.
    Remove,
    /// `MONITOR C` — clear the monitor list.
    Clear,
    /// `MONITOR L` — list the monitor list.
    List,
    /// `MONITOR S` — get the online/offline status of everything monitored.
    Status,
}

impl MonitorSubCommand {
    fn as_str(self) -> &'static str {
        match self {
            MonitorSubCommand::Add => "+",
            MonitorSubCommand::Remove => "-",
            MonitorSubCommand::Clear => "C",
            MonitorSubCommand::List => "L",
            MonitorSubCommand::Status => "S",
        }
    }
}

/// The `METADATA` subcommand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataSubCommand {
    /// Fetch one or more keys.
    GET,
    /// List all keys for a target.
    LIST,
    /// Set a key's value.
    SET,
    /// Subscribe to change notifications for a key.
    SUB,
    /// Unsubscribe from a key.
    UNSUB,
    /// List currently subscribed keys.
    SUBS,
    /// Request a full metadata sync for a target.
    SYNC,
    /// Clear all metadata for a target.
    CLEAR,
}

impl MetadataSubCommand {
    fn as_str(self) -> &'static str {
        match self {
            MetadataSubCommand::GET => "GET",
            MetadataSubCommand::LIST => "LIST",
            MetadataSubCommand::SET => "SET",
            MetadataSubCommand::SUB => "SUB",
            MetadataSubCommand::UNSUB => "UNSUB",
            MetadataSubCommand::SUBS => "SUBS",
            MetadataSubCommand::SYNC => "SYNC",
            MetadataSubCommand::CLEAR => "CLEAR",
        }
    }
}

/// Every outgoing command this engine knows how to format, per
/// [RFC 2812](http://tools.ietf.org/html/rfc2812) and the IRCv3 extensions it negotiates.
///
/// This is a pure wire-serialization type: it carries no knowledge of negotiated capabilities or
/// ISUPPORT limits. Gating (e.g. whether to prefix `@tags `, whether a `KICK` reason fits within
/// `KICKLEN`) is the engine's job, not this enum's.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `CAP <subcommand> [params]`
    CAP(CapSubCommand, Option<String>),
    /// `AUTHENTICATE <data>`
    AUTHENTICATE(String),
    /// `PASS :password`
    PASS(String),
    /// `NICK :nickname`
    NICK(String),
    /// `USER user mode * :realname`
    USER(String, String, String),
    /// `OPER name :password`
    OPER(String, String),
    /// `MODE target [modes [modeparams]]`
    MODE(String, String, Vec<String>),
    /// `QUIT :comment`
    QUIT(Option<String>),
    /// `SQUIT server :comment`
    SQUIT(String, String),
    /// `JOIN chanlist [chankeys]`
    JOIN(String, Option<String>),
    /// `PART chanlist :[comment]`
    PART(String, Option<String>),
    /// `TOPIC channel :[topic]`
    TOPIC(String, Option<String>),
    /// `NAMES [chanlist]`
    NAMES(Option<String>),
    /// `LIST [chanlist]`
    LIST(Option<String>),
    /// `INVITE nickname channel`
    INVITE(String, String),
    /// `KICK chanlist userlist :[comment]`
    KICK(String, String, Option<String>),
    /// `PRIVMSG msgtarget :message`
    PRIVMSG(String, String),
    /// `NOTICE msgtarget :message`
    NOTICE(String, String),
    /// `TAGMSG msgtarget`
    TAGMSG(String),
    /// `WHO mask`
    WHO(String),
    /// `WHOIS target`
    WHOIS(String),
    /// `WALLOPS :text`
    WALLOPS(String),
    /// `REHASH`
    REHASH,
    /// `RESTART`
    RESTART,
    /// `VERSION :[target]`
    VERSION(Option<String>),
    /// `ADMIN :[target]`
    ADMIN(Option<String>),
    /// `LUSERS [mask :[target]]`
    LUSERS(Option<String>, Option<String>),
    /// `AWAY :[message]`
    AWAY(Option<String>),
    /// `ISON nicklist`
    ISON(Vec<String>),
    /// `PING :server`
    PING(String),
    /// `PONG :server`
    PONG(String),
    /// `MONITOR <subcommand> [targets]`
    MONITOR(MonitorSubCommand, Option<Vec<String>>),
    /// `METADATA target subcommand [params]`
    METADATA(String, MetadataSubCommand, Vec<String>),
    /// Anything not covered above, sent verbatim as `verb [middles...] [:trailing]`.
    Raw(String, Vec<String>, Option<String>),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::CAP(sub, params) => match params {
                Some(p) => write!(f, "CAP {} {}", sub, p),
                None => write!(f, "CAP {}", sub),
            },
            Command::AUTHENTICATE(data) => write!(f, "AUTHENTICATE {}", data),
            Command::PASS(pass) => write!(f, "PASS :{}", pass),
            Command::NICK(nick) => write!(f, "NICK {}", nick),
            Command::USER(user, mode, real) => write!(f, "USER {} {} * :{}", user, mode, real),
            Command::OPER(name, pass) => write!(f, "OPER {} :{}", name, pass),
            Command::MODE(target, modes, args) => {
                write!(f, "MODE {}", target)?;
                if !modes.is_empty() {
                    write!(f, " {}", modes)?;
                }
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Command::QUIT(Some(msg)) => write!(f, "QUIT :{}", msg),
            Command::QUIT(None) => write!(f, "QUIT"),
            Command::SQUIT(server, comment) => write!(f, "SQUIT {} :{}", server, comment),
            Command::JOIN(chans, Some(keys)) => write!(f, "JOIN {} {}", chans, keys),
            Command::JOIN(chans, None) => write!(f, "JOIN {}", chans),
            Command::PART(chans, Some(msg)) => write!(f, "PART {} :{}", chans, msg),
            Command::PART(chans, None) => write!(f, "PART {}", chans),
            Command::TOPIC(chan, Some(topic)) => write!(f, "TOPIC {} :{}", chan, topic),
            Command::TOPIC(chan, None) => write!(f, "TOPIC {}", chan),
            Command::NAMES(Some(chans)) => write!(f, "NAMES {}", chans),
            Command::NAMES(None) => write!(f, "NAMES"),
            Command::LIST(Some(chans)) => write!(f, "LIST {}", chans),
            Command::LIST(None) => write!(f, "LIST"),
            Command::INVITE(nick, chan) => write!(f, "INVITE {} {}", nick, chan),
            Command::KICK(chans, users, Some(comment)) => {
                write!(f, "KICK {} {} :{}", chans, users, comment)
            }
            Command::KICK(chans, users, None) => write!(f, "KICK {} {}", chans, users),
            Command::PRIVMSG(target, msg) => write!(f, "PRIVMSG {} :{}", target, msg),
            Command::NOTICE(target, msg) => write!(f, "NOTICE {} :{}", target, msg),
            Command::TAGMSG(target) => write!(f, "TAGMSG {}", target),
            Command::WHO(mask) => write!(f, "WHO {}", mask),
            Command::WHOIS(target) => write!(f, "WHOIS {}", target),
            Command::WALLOPS(text) => write!(f, "WALLOPS :{}", text),
            Command::REHASH => write!(f, "REHASH"),
            Command::RESTART => write!(f, "RESTART"),
            Command::VERSION(Some(target)) => write!(f, "VERSION {}", target),
            Command::VERSION(None) => write!(f, "VERSION"),
            Command::ADMIN(Some(target)) => write!(f, "ADMIN {}", target),
            Command::ADMIN(None) => write!(f, "ADMIN"),
            Command::LUSERS(Some(mask), Some(target)) => write!(f, "LUSERS {} {}", mask, target),
            Command::LUSERS(Some(mask), None) => write!(f, "LUSERS {}", mask),
            Command::LUSERS(None, _) => write!(f, "LUSERS"),
            Command::AWAY(Some(msg)) => write!(f, "AWAY :{}", msg),
            Command::AWAY(None) => write!(f, "AWAY"),
            Command::ISON(nicks) => write!(f, "ISON {}", nicks.join(" ")),
            Command::PING(server) => write!(f, "PING :{}", server),
            Command::PONG(server) => write!(f, "PONG :{}", server),
            Command::MONITOR(sub, Some(targets)) => {
                write!(f, "MONITOR {} {}", sub.as_str(), targets.join(","))
            }
            Command::MONITOR(sub, None) => write!(f, "MONITOR {}", sub.as_str()),
            Command::METADATA(target, sub, params) => {
                write!(f, "METADATA {} {}", target, sub.as_str())?;
                for param in params {
                    write!(f, " {}", param)?;
                }
                Ok(())
            }
            Command::Raw(verb, args, trailing) => {
                write!(f, "{}", verb)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                if let Some(trailing) = trailing {
                    write!(f, " :{}", trailing)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn formats_cap_ls() {
        assert_eq!(Command::CAP(CapSubCommand::LS, Some("302".into())).to_string(), "CAP LS 302");
    }

    #[test]
    fn formats_cap_req() {
        assert_eq!(
            Command::CAP(CapSubCommand::REQ, Some("multi-prefix sasl".into())).to_string(),
            "CAP REQ multi-prefix sasl"
        );
    }

    #[test]
    fn formats_user_registration() {
        assert_eq!(
            Command::USER("someone".into(), "0".into(), "someone".into()).to_string(),
            "USER someone 0 * :someone"
        );
    }

    #[test]
    fn formats_join_with_and_without_keys() {
        assert_eq!(Command::JOIN("#a,#b".into(), None).to_string(), "JOIN #a,#b");
        assert_eq!(
            Command::JOIN("#a".into(), Some("key".into())).to_string(),
            "JOIN #a key"
        );
    }

    #[test]
    fn formats_privmsg() {
        assert_eq!(
            Command::PRIVMSG("#rust".into(), "hi".into()).to_string(),
            "PRIVMSG #rust :hi"
        );
    }

    #[test]
    fn formats_kick_without_comment() {
        assert_eq!(Command::KICK("#a".into(), "nick".into(), None).to_string(), "KICK #a nick");
    }

    #[test]
    fn formats_metadata_set() {
        assert_eq!(
            Command::METADATA(
                "#a".into(),
                MetadataSubCommand::SET,
                vec!["avatar".into(), "*".into(), ":https://x".into()]
            )
            .to_string(),
            "METADATA #a SET avatar * :https://x"
        );
    }

    #[test]
    fn formats_monitor_add() {
        assert_eq!(
            Command::MONITOR(MonitorSubCommand::Add, Some(vec!["a".into(), "b".into()])).to_string(),
            "MONITOR + a,b"
        );
    }

    #[test]
    fn cap_subcommand_roundtrips_through_str() {
        for sub in [
            CapSubCommand::LS,
            CapSubCommand::LIST,
            CapSubCommand::REQ,
            CapSubCommand::ACK,
            CapSubCommand::NAK,
            CapSubCommand::END,
            CapSubCommand::NEW,
            CapSubCommand::DEL,
        ] {
            assert_eq!(sub.as_str().parse::<CapSubCommand>().unwrap(), sub);
        }
    }
}
