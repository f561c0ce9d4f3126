//! The engine-side half of the outgoing formatter (spec §4.11): tag-prefix gating and the
//! domain invariants that need negotiated capability / ISUPPORT state the wire-only
//! `relaychat_proto::Command` type doesn't carry.
use std::collections::BTreeMap;

use relaychat_proto::command::Command;
use relaychat_proto::message::encode_tags;

use crate::capability::CapabilityNegotiator;
use crate::error::{EngineError, ErrorKind, Result};
use crate::isupport::IsupportStore;

/// Formats `command` into a complete wire line (including trailing CR/LF), prefixing `@tags ` if
/// `message-tags` is enabled and `tags` is non-empty, and enforcing:
/// - `KICK`'s reason must fit within ISUPPORT's `KICKLEN`, if declared.
/// - `OPER`'s name/password and `SQUIT`'s server operand must not contain spaces.
pub fn format_line(
    command: &Command,
    tags: &BTreeMap<String, String>,
    caps: &CapabilityNegotiator,
    isupport: &IsupportStore,
) -> Result<String> {
    validate(command, isupport)?;

    let mut line = String::new();
    if caps.is_enabled("message-tags") && !tags.is_empty() {
        line.push('@');
        line.push_str(&encode_tags(tags));
        line.push(' ');
    }
    line.push_str(&command.to_string());
    line.push_str("\r\n");
    Ok(line)
}

fn validate(command: &Command, isupport: &IsupportStore) -> Result<()> {
    match command {
        Command::KICK(_, _, Some(reason)) => {
            if let Some(limit) = isupport.kicklen {
                if reason.len() > limit {
                    return Err(EngineError::new(
                        ErrorKind::BadUserInput,
                        format!("KICK reason exceeds KICKLEN={limit}"),
                    ));
                }
            }
        }
        Command::OPER(name, password) => {
            if name.contains(' ') || password.contains(' ') {
                return Err(EngineError::new(ErrorKind::BadUserInput, "OPER operands must not contain spaces"));
            }
        }
        Command::SQUIT(server, _) => {
            if server.contains(' ') {
                return Err(EngineError::new(ErrorKind::BadUserInput, "SQUIT server operand must not contain spaces"));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use relaychat_proto::command::Command;

    fn caps_with(name: &str) -> CapabilityNegotiator {
        let mut caps = CapabilityNegotiator::new();
        caps.receive_ls(&[name.to_owned()]);
        caps.note_requested();
        caps.receive_ack(&[name.to_owned()]);
        caps
    }

    #[test]
    fn tags_are_prefixed_only_when_message_tags_enabled() {
        let command = Command::PRIVMSG("#a".into(), "hi".into());
        let isupport = IsupportStore::new();
        let mut tags = BTreeMap::new();
        tags.insert("+draft/reply".into(), "abc".into());

        let without_cap = CapabilityNegotiator::new();
        let line = format_line(&command, &tags, &without_cap, &isupport).unwrap();
        assert_eq!(line, "PRIVMSG #a :hi\r\n");

        let with_cap = caps_with("message-tags");
        let line = format_line(&command, &tags, &with_cap, &isupport).unwrap();
        assert_eq!(line, "@+draft/reply=abc PRIVMSG #a :hi\r\n");
    }

    #[test]
    fn kick_reason_over_kicklen_is_rejected() {
        let mut isupport = IsupportStore::new();
        isupport.feed("KICKLEN=5");
        let command = Command::KICK("#a".into(), "nick".into(), Some("too long a reason".into()));
        let caps = CapabilityNegotiator::new();
        let err = format_line(&command, &BTreeMap::new(), &caps, &isupport).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadUserInput);
    }

    #[test]
    fn oper_with_space_in_operand_is_rejected() {
        let command = Command::OPER("bad name".into(), "pw".into());
        let caps = CapabilityNegotiator::new();
        let isupport = IsupportStore::new();
        assert!(format_line(&command, &BTreeMap::new(), &caps, &isupport).is_err());
    }

    #[test]
    fn squit_with_space_in_server_is_rejected() {
        let command = Command::SQUIT("bad server".into(), "bye".into());
        let caps = CapabilityNegotiator::new();
        let isupport = IsupportStore::new();
        assert!(format_line(&command, &BTreeMap::new(), &caps, &isupport).is_err());
    }
}
