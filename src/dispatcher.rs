//! The verb/numeric dispatch table (spec §4.8), plus the small leaf functions that turn each
//! numeric's positional arguments into a typed call into the rest of the engine.
use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, TimeZone, Utc};
use relaychat_proto::command::{CapSubCommand, Command};
use relaychat_proto::message::ParsedMessage;
use relaychat_proto::mode::{parse_mode_string, ModeCategoryMap};
use relaychat_proto::response::Response;

use crate::engine::Engine;
use crate::error::ErrorKind;
use crate::events::{LuserKind, MessageKind};
use crate::metadata::MetadataTarget;
use crate::sasl::SaslOutcome;
use crate::user::User;

/// What `dispatch_message` computes for every line before verb dispatch (spec §4.8 step 1):
/// the original raw text, the enclosing batch's reference tag if this line was batched, its
/// decoded tags, and the instant it was sent.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageMetadata {
    /// The original, unmodified wire line.
    pub raw: String,
    /// The `batch=<tag>` this line was tagged with, if any.
    pub batch: Option<String>,
    /// The line's decoded message tags.
    pub tags: BTreeMap<String, String>,
    /// The `time` tag parsed as an ISO-8601 instant, or the local clock in UTC if the tag was
    /// absent or unparseable.
    pub time: DateTime<Utc>,
}

/// Computes a line's `MessageMetadata`, falling back to the local clock in UTC when `message`
/// carries no well-formed `time` tag.
fn compute_metadata(message: &ParsedMessage) -> MessageMetadata {
    let time = message
        .server_time()
        .and_then(|ts| Utc.timestamp_opt(ts.unix_seconds, ts.nanos).single())
        .unwrap_or_else(Utc::now);
    MessageMetadata {
        raw: message.raw.clone(),
        batch: message.tags.get("batch").cloned(),
        tags: message.tags.clone(),
        time,
    }
}

impl<'a, W: Write> Engine<'a, W> {
    pub(crate) fn dispatch_message(&mut self, message: ParsedMessage) {
        let metadata = compute_metadata(&message);
        self.events.on_message_metadata(&metadata);
        self.events.on_raw(&message.raw);
        let source = self.upsert_source(&message);

        if let Ok(code) = message.verb.parse::<u16>() {
            match Response::from_u16(code) {
                Some(response) => self.dispatch_numeric(response, &message, source.as_ref()),
                None => self.emit_error(ErrorKind::Unrecognized, format!("unrecognized numeric {code}")),
            }
            return;
        }

        match message.verb.as_str() {
            "PING" => self.handle_ping(&message),
            "JOIN" => self.handle_join(&message, source.as_ref()),
            "PART" => self.handle_part(&message, source.as_ref()),
            "KICK" => self.handle_kick(&message, source.as_ref()),
            "QUIT" => self.handle_quit(&message, source.as_ref()),
            "NICK" => self.handle_nick(&message),
            "PRIVMSG" => self.handle_message(&message, source.as_ref(), MessageKind::Privmsg),
            "NOTICE" => self.handle_message(&message, source.as_ref(), MessageKind::Notice),
            "TAGMSG" => {}
            "MODE" => self.handle_mode(&message, source.as_ref()),
            "TOPIC" => self.handle_topic(&message, source.as_ref()),
            "INVITE" => self.handle_invite(&message, source.as_ref()),
            "CHGHOST" => self.handle_chghost(&message),
            "ACCOUNT" => self.handle_account(&message, source.as_ref()),
            "AUTHENTICATE" => self.handle_authenticate(&message),
            "CAP" => self.handle_cap(&message),
            "METADATA" => self.handle_metadata_verb(&message),
            "FAIL" => self.handle_fail(&message),
            "WALLOPS" => self.handle_wallops(&message, source.as_ref()),
            "WARN" | "NOTE" | "BATCH" => {}
            _ => self.emit_error(ErrorKind::Unrecognized, format!("unrecognized verb {}", message.verb)),
        }
    }

    /// Builds a `User` from `message`'s prefix (if any) and its `account` tag (if any), then
    /// merge-upserts it into the address book and returns the resulting canonical entry.
    fn upsert_source(&mut self, message: &ParsedMessage) -> Option<User> {
        let prefix = message.source.as_ref()?;
        let mut incoming = match prefix {
            relaychat_proto::prefix::Prefix::Nickname(nick, user, host) => User::from_mask(nick, user, host),
            relaychat_proto::prefix::Prefix::ServerName(_) => return None,
        };
        if let Some(account) = message.tags.get("account") {
            incoming.set_account(account);
        }
        let casemap = self.isupport.casemapping;
        Some(self.address_book.update(incoming, casemap).clone())
    }

    fn is_self(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.self_nick)
    }

    // -- Verb handlers ------------------------------------------------------------------------

    fn handle_ping(&mut self, message: &ParsedMessage) {
        let payload = message.arg(0).unwrap_or("").to_owned();
        self.auto_send(Command::PONG(payload));
    }

    fn handle_join(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let (Some(channel), Some(user)) = (message.arg(0), source) else { return };
        let casemap = self.isupport.casemapping;
        self.address_book.upsert_channel(channel, casemap).upsert_member(casemap.fold(&user.nickname), "");

        if self.is_self(&user.nickname) && self.isupport.whox {
            self.auto_send(Command::WHO(format!("{channel} %uihsnflar")));
        }

        self.events.on_join(channel, user);
    }

    fn handle_part(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let (Some(channel), Some(user)) = (message.arg(0), source) else { return };
        let reason = message.arg(1);
        let casemap = self.isupport.casemapping;

        if self.is_self(&user.nickname) {
            self.address_book.remove_channel(channel, casemap);
        } else if let Some(chan) = self.address_book.channel_mut(channel, casemap) {
            chan.remove_member(&casemap.fold(&user.nickname));
        }

        self.events.on_part(channel, user, reason);
    }

    fn handle_kick(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let (Some(channel), Some(target_nick), Some(by)) = (message.arg(0), message.arg(1), source) else { return };
        let reason = message.arg(2);
        let casemap = self.isupport.casemapping;

        if self.is_self(target_nick) {
            self.address_book.remove_channel(channel, casemap);
        } else if let Some(chan) = self.address_book.channel_mut(channel, casemap) {
            chan.remove_member(&casemap.fold(target_nick));
        }

        self.events.on_kick(channel, by, target_nick, reason);
    }

    fn handle_quit(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let Some(user) = source else { return };
        let reason = message.arg(0);
        let casemap = self.isupport.casemapping;
        self.address_book.remove_from_all_channels(&user.nickname, casemap);
        self.address_book.invalidate(&user.nickname, casemap);
        self.events.on_quit(user, reason);
    }

    fn handle_nick(&mut self, message: &ParsedMessage) {
        let (Some(old_nick), Some(new_nick)) = (message.source_nickname(), message.arg(0)) else { return };
        let old_nick = old_nick.to_owned();
        let casemap = self.isupport.casemapping;
        self.address_book.rename(&old_nick, new_nick, casemap);
        if self.is_self(&old_nick) {
            self.self_nick = new_nick.to_owned();
        }
        self.events.on_nick(&old_nick, new_nick);
    }

    fn handle_message(&mut self, message: &ParsedMessage, source: Option<&User>, kind: MessageKind) {
        let (Some(target), Some(user)) = (message.arg(0), source) else { return };
        let text = message.arg(1).unwrap_or("");
        let is_echo = self.is_self(&user.nickname);
        self.events.on_message(kind, user, target, text, is_echo);
    }

    fn handle_mode(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let Some(target) = message.arg(0) else { return };
        let categories =
            if self.isupport.is_channel_name(target) { self.isupport.chanmodes.clone() } else { ModeCategoryMap::new() };
        let letters = message.arg(1).unwrap_or("");
        let rest: Vec<&str> = message.args.get(2..).unwrap_or(&[]).iter().map(String::as_str).collect();
        let changes = parse_mode_string(letters, &rest, &categories);
        let casemap = self.isupport.casemapping;

        for change in &changes {
            if let Some(channel) = self.address_book.channel_mut(target, casemap) {
                match change.sign {
                    relaychat_proto::mode::Sign::Set => {
                        channel.modes.insert(change.mode.letter, change.mode.arg.clone());
                    }
                    relaychat_proto::mode::Sign::Unset => {
                        channel.modes.remove(&change.mode.letter);
                    }
                }
            }
            self.events.on_mode(target, change, source);
        }
    }

    fn handle_topic(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let Some(channel) = message.arg(0) else { return };
        let topic = message.arg(1);
        let casemap = self.isupport.casemapping;
        if let Some(chan) = self.address_book.channel_mut(channel, casemap) {
            chan.topic = topic.map(String::from);
        }
        self.events.on_topic_change(channel, topic, source);
    }

    fn handle_invite(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let (Some(invited_nick), Some(channel), Some(by)) = (message.arg(0), message.arg(1), source) else { return };
        self.events.on_invite(channel, by, invited_nick);
    }

    fn handle_chghost(&mut self, message: &ParsedMessage) {
        let (Some(nick), Some(new_user), Some(new_host)) =
            (message.source_nickname(), message.arg(0), message.arg(1))
        else {
            return;
        };
        let casemap = self.isupport.casemapping;
        let incoming = User::from_mask(nick, new_user, new_host);
        self.address_book.update(incoming, casemap);
        self.events.on_chg_host(nick, new_user, new_host);
    }

    fn handle_account(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let (Some(value), Some(user)) = (message.arg(0), source) else { return };
        let nick = user.nickname.clone();
        let casemap = self.isupport.casemapping;
        match self.address_book.get_mut(&nick, casemap) {
            Some(known) => known.set_account(value),
            None => {
                let mut incoming = User::new(nick);
                incoming.set_account(value);
                self.address_book.update(incoming, casemap);
            }
        }
    }

    fn handle_authenticate(&mut self, message: &ParsedMessage) {
        let chunk = message.arg(0).unwrap_or("");
        if let Some(challenge) = self.sasl.receive_chunk(chunk) {
            for line in self.sasl.respond(&challenge) {
                self.auto_send(Command::AUTHENTICATE(line));
            }
        }
    }

    fn handle_wallops(&mut self, message: &ParsedMessage, source: Option<&User>) {
        let text = message.arg(0).unwrap_or("");
        self.events.on_wallops(text, source);
    }

    fn handle_fail(&mut self, message: &ParsedMessage) {
        let description = message.args.last().map(String::as_str).unwrap_or("");
        self.emit_error(ErrorKind::StandardFail, description.to_owned());
    }

    fn handle_metadata_verb(&mut self, message: &ParsedMessage) {
        let (Some(target_str), Some(key)) = (message.arg(0), message.arg(1)) else { return };
        let visibility = message.arg(2).unwrap_or("*");
        let value = message.arg(3);
        let target = MetadataTarget::parse(target_str, &self.isupport);
        let casemap = self.isupport.casemapping;
        self.metadata.set(&target, key, visibility, value, casemap);
    }

    // -- CAP subcommand handling ----------------------------------------------------------------

    fn handle_cap(&mut self, message: &ParsedMessage) {
        let Some(sub) = message.arg(1) else { return };
        let rest: Vec<String> = message.args.get(2..).unwrap_or(&[]).to_vec();

        match sub {
            "LS" => {
                let (newly, done) = self.caps.receive_ls(&rest);
                self.pending_cap_requests.extend(newly);
                if done {
                    let assembled = self.pending_cap_requests.clone();
                    self.events.on_receive_cap_ls(&assembled);
                    self.finish_cap_ls();
                }
            }
            "LIST" => {
                let names = last_token_list(&rest);
                self.events.on_receive_cap_list(&names);
            }
            "ACK" => {
                let acked = self.caps.receive_ack(&rest);
                self.events.on_receive_cap_ack(&acked);
                for name in acked.clone() {
                    self.apply_cap_specific_config(&name);
                }
                self.maybe_complete_negotiation();
            }
            "NAK" => {
                self.caps.receive_nak(&rest);
                let naked = last_token_list(&rest);
                self.events.on_receive_cap_nak(&naked);
                self.maybe_complete_negotiation();
            }
            "NEW" => {
                let wanted = self.caps.receive_new(&rest);
                let all = last_token_list(&rest);
                self.events.on_receive_cap_new(&all);
                if !wanted.is_empty() {
                    self.caps.note_requested();
                    self.auto_send(Command::CAP(CapSubCommand::REQ, Some(wanted.join(" "))));
                }
            }
            "DEL" => {
                self.caps.receive_del(&rest);
                let names = last_token_list(&rest);
                self.events.on_receive_cap_del(&names);
            }
            _ => {}
        }
    }

    fn finish_cap_ls(&mut self) {
        let wanted = std::mem::take(&mut self.pending_cap_requests);
        if wanted.is_empty() {
            self.maybe_complete_negotiation();
            return;
        }
        self.caps.note_requested();
        self.auto_send(Command::CAP(CapSubCommand::REQ, Some(wanted.join(" "))));
    }

    fn apply_cap_specific_config(&mut self, name: &str) {
        match name {
            "sasl" => {
                if !self.identity.sasl_mechanisms.is_empty() {
                    let server_list: Vec<String> = self
                        .caps
                        .enabled_value("sasl")
                        .map(|v| v.split(',').filter(|s| !s.is_empty()).map(str::to_owned).collect())
                        .unwrap_or_default();
                    let server_refs: Vec<&str> = server_list.iter().map(String::as_str).collect();
                    if let Some(mechanism) = self.sasl.begin(&server_refs) {
                        self.auto_send(Command::AUTHENTICATE(mechanism));
                    }
                }
            }
            "draft/metadata-2" => {
                if let Some(value) = self.caps.enabled_value("draft/metadata-2").map(String::from) {
                    self.metadata.apply_cap_value(&value);
                }
            }
            _ => {}
        }
    }

    fn handle_sasl_outcome(&mut self, outcome: SaslOutcome, message: &str) {
        self.sasl.finish(outcome);
        self.caps.note_sasl_finished();
        if self.caps.state() == crate::capability::NegotiationState::Done {
            self.auto_send(Command::CAP(CapSubCommand::END, None));
        }
        if outcome == SaslOutcome::Failure {
            // The kind enum has no SASL-specific variant; `standardFail` is the closest available
            // catch-all for a protocol-level authentication failure.
            self.emit_error(ErrorKind::StandardFail, message.to_owned());
        }
        self.maybe_fire_connect();
    }

    // -- Numeric handlers -----------------------------------------------------------------------

    fn dispatch_numeric(&mut self, code: Response, message: &ParsedMessage, source: Option<&User>) {
        match code {
            Response::RPL_WELCOME => self.handle_welcome(message),
            Response::RPL_ISUPPORT => self.handle_isupport(message),
            Response::RPL_NAMREPLY => self.handle_names(message),
            Response::RPL_TOPIC => self.handle_topic_reply(message),
            Response::RPL_TOPICWHOTIME => self.handle_topic_who_time(message),
            Response::RPL_WHOXREPLY => self.handle_whox(message),
            Response::ERR_NOMOTD => self.emit_error(ErrorKind::NoMotd, "no MOTD"),
            Response::RPL_LIST => self.handle_list_row(message),
            Response::RPL_LISTEND => self.events.on_channel_list_update(),
            Response::RPL_LUSERCLIENT => self.emit_luser(LuserKind::Client, message),
            Response::RPL_LUSEROP => self.emit_luser(LuserKind::Op, message),
            Response::RPL_LUSERUNKNOWN => self.emit_luser(LuserKind::Unknown, message),
            Response::RPL_LUSERCHANNELS => self.emit_luser(LuserKind::Channels, message),
            Response::RPL_LUSERME => self.emit_luser(LuserKind::Me, message),
            Response::RPL_VERSION => self.handle_version(message),
            Response::RPL_YOUREOPER => self.events.on_youre_oper(),
            Response::RPL_REHASHING => self.events.on_server_rehashing(message.arg(0).unwrap_or("")),
            Response::RPL_AWAY => self.handle_other_user_away(message),
            Response::RPL_UNAWAY => {
                self.events.on_unaway_reply();
                self.events.on_back();
            }
            Response::RPL_NOWAWAY => self.events.on_away_reply(message.args.last().map(String::as_str).unwrap_or("")),
            Response::RPL_ISON => self.handle_ison(message),
            Response::RPL_WHOISUSER => self.handle_whois_user(message),
            Response::RPL_WHOISSERVER => self.handle_whois_server(message),
            Response::RPL_WHOISOPERATOR => self.whois_feed(message, |w, n, cm| w.feed_operator(n, cm)),
            Response::RPL_WHOISIDLE => self.handle_whois_idle(message),
            Response::RPL_ENDOFWHOIS => self.handle_end_of_whois(message),
            Response::RPL_WHOISCHANNELS => self.handle_whois_channels(message),
            Response::RPL_WHOISACCOUNT => self.handle_whois_account(message),
            Response::RPL_WHOISHOST => self.whois_feed(message, |w, n, cm| w.feed_host(n, cm)),
            Response::RPL_WHOISSECURE => self.whois_feed(message, |w, n, cm| w.feed_secure(n, cm)),
            Response::RPL_WHOISREGNICK => self.whois_feed(message, |w, n, cm| w.feed_registered_nick(n, cm)),
            Response::RPL_MONONLINE => self.handle_monitor_names(message, |events, nick| events.on_user_online(nick)),
            Response::RPL_MONOFFLINE => self.handle_monitor_names(message, |events, nick| events.on_user_offline(nick)),
            Response::RPL_MONLIST => {
                let names = last_token_list(&message.args);
                self.events.on_monitor_list(&names);
            }
            Response::RPL_WHOISKEYVALUE => self.handle_whois_key_value(message),
            Response::RPL_KEYVALUE => self.handle_key_value(message),
            Response::RPL_METADATASUBOK => self.handle_metadata_sub_ok(message),
            Response::RPL_METADATAUNSUBOK => self.handle_metadata_unsub_ok(message),
            Response::RPL_METADATASUBS => self.handle_metadata_subs(message),
            Response::RPL_LOGON => {
                if let Some(nick) = message.arg(1) {
                    self.events.on_user_online(nick);
                }
            }
            Response::RPL_LOGGEDIN => self.handle_login(message),
            Response::RPL_LOGGEDOUT => {
                if let Some(nick) = message.arg(1).and_then(|mask| mask.split('!').next()) {
                    self.events.on_logout(nick);
                }
            }
            Response::RPL_SASLSUCCESS => self.handle_sasl_outcome(SaslOutcome::Success, "SASL authentication successful"),
            Response::ERR_NOSUCHSERVER => self.emit_numeric_error(ErrorKind::NoSuchServer, message),
            Response::ERR_NOPRIVILEGES => self.emit_numeric_error(ErrorKind::NoPrivileges, message),
            Response::ERR_NOPRIVS => self.emit_numeric_error(ErrorKind::NoPrivs, message),
            Response::ERR_MONLISTFULL => self.emit_numeric_error(ErrorKind::MonListFull, message),
            Response::ERR_METADATALIMIT => self.emit_numeric_error(ErrorKind::TooManySubs, message),
            Response::ERR_KEYNOTSET => self.emit_numeric_error(ErrorKind::KeyNotSet, message),
            Response::ERR_METADATASYNCLATER => self.emit_numeric_error(ErrorKind::WaitAndRetry, message),
            Response::ERR_NICKLOCKED | Response::ERR_SASLFAIL | Response::ERR_SASLTOOLONG | Response::ERR_SASLABORTED => {
                let text = message.args.last().map(String::as_str).unwrap_or("SASL failed").to_owned();
                self.handle_sasl_outcome(SaslOutcome::Failure, &text);
            }
            _ => {
                let _ = source;
            }
        }
    }

    fn handle_welcome(&mut self, message: &ParsedMessage) {
        self.registered = true;
        if let Some(nick) = message.arg(0) {
            self.self_nick = nick.to_owned();
        }
        self.maybe_fire_connect();
    }

    fn handle_isupport(&mut self, message: &ParsedMessage) {
        let tokens = message.args.get(1..message.args.len().saturating_sub(1)).unwrap_or(&[]).to_vec();
        for token in &tokens {
            let newly = self.isupport.feed(token);
            if newly.namesx && !self.caps.is_enabled("multi-prefix") {
                self.auto_send(Command::Raw("PROTOCTL".into(), vec!["NAMESX".into()], None));
            }
            if newly.uhnames && !self.caps.is_enabled("userhost-in-names") {
                self.auto_send(Command::Raw("PROTOCTL".into(), vec!["UHNAMES".into()], None));
            }
        }
    }

    fn handle_names(&mut self, message: &ParsedMessage) {
        let (Some(channel), Some(names_str)) = (message.arg(2), message.arg(3)) else { return };
        let casemap = self.isupport.casemapping;
        let prefix_chars: Vec<char> = self.isupport.prefix.iter().map(|(_, p)| *p).collect();
        let mut names = Vec::new();
        for token in names_str.split_whitespace() {
            names.push(token.to_owned());
            let split_at = token.chars().take_while(|c| prefix_chars.contains(c)).count();
            let (prefix, nick) = token.split_at(split_at);
            self.address_book.upsert_channel(channel, casemap).upsert_member(casemap.fold(nick), prefix);
        }
        self.events.on_names_reply(channel, &names);
    }

    fn handle_topic_reply(&mut self, message: &ParsedMessage) {
        let (Some(channel), Some(topic)) = (message.arg(1), message.arg(2)) else { return };
        let casemap = self.isupport.casemapping;
        if let Some(chan) = self.address_book.channel_mut(channel, casemap) {
            chan.topic = Some(topic.to_owned());
        }
        self.events.on_topic_reply(channel, topic);
    }

    fn handle_topic_who_time(&mut self, message: &ParsedMessage) {
        let (Some(channel), Some(who), Some(set_at)) = (message.arg(1), message.arg(2), message.arg(3)) else { return };
        let casemap = self.isupport.casemapping;
        if let Some(chan) = self.address_book.channel_mut(channel, casemap) {
            chan.topic_who_time = Some((who.to_owned(), set_at.to_owned()));
        }
        self.events.on_topic_who_time_reply(channel, who, set_at);
    }

    fn handle_whox(&mut self, message: &ParsedMessage) {
        let fields: Vec<String> = message.args.get(1..).unwrap_or(&[]).to_vec();
        // Field order follows this engine's own WHOX request mask (`%uihsnflar`, sent from
        // `handle_join`): ident, ip, host, server, nick, flags, hopcount&real, account, realname.
        if let (Some(ident), Some(host), Some(nick)) = (fields.first(), fields.get(2), fields.get(4)) {
            let casemap = self.isupport.casemapping;
            let mut user = User::from_mask(nick, ident, host);
            if let Some(account) = fields.get(7).filter(|a| a.as_str() != "0") {
                user.account = Some(account.clone());
            }
            self.address_book.update(user, casemap);
        }
        self.events.on_whox_reply(&fields);
    }

    fn handle_list_row(&mut self, message: &ParsedMessage) {
        let (Some(channel), Some(visible), Some(topic)) = (message.arg(1), message.arg(2), message.arg(3)) else {
            return;
        };
        let visible_count: u32 = visible.parse().unwrap_or(0);
        self.events.on_list(channel, visible_count, topic);
    }

    fn emit_luser(&mut self, kind: LuserKind, message: &ParsedMessage) {
        let text = message.args.last().map(String::as_str).unwrap_or("");
        self.events.on_luser(kind, text);
    }

    fn handle_version(&mut self, message: &ParsedMessage) {
        let (Some(version), Some(server), Some(comments)) = (message.arg(1), message.arg(2), message.arg(3)) else {
            return;
        };
        self.events.on_version_reply(version, server, comments);
    }

    fn handle_other_user_away(&mut self, message: &ParsedMessage) {
        let (Some(nick), Some(msg)) = (message.arg(1), message.arg(2)) else { return };
        self.events.on_other_user_away_reply(nick, msg);
    }

    fn handle_ison(&mut self, message: &ParsedMessage) {
        let text = message.args.last().map(String::as_str).unwrap_or("");
        for nick in text.split_whitespace() {
            self.events.on_is_on(nick);
        }
    }

    fn whois_feed(&mut self, message: &ParsedMessage, f: impl FnOnce(&mut crate::whois::WhoisAggregator, &str, crate::isupport::CaseMapping)) {
        let Some(nick) = message.arg(1) else { return };
        let casemap = self.isupport.casemapping;
        f(&mut self.whois, nick, casemap);
    }

    /// `311 <client> <nick> <user> <host> * :<real name>` — note the literal `*` at index 4
    /// before the real name.
    fn handle_whois_user(&mut self, message: &ParsedMessage) {
        let (Some(nick), Some(user), Some(host), Some(real)) =
            (message.arg(1), message.arg(2), message.arg(3), message.arg(5))
        else {
            return;
        };
        let casemap = self.isupport.casemapping;
        self.whois.feed_user(nick, user, host, real, casemap);
    }

    fn handle_whois_server(&mut self, message: &ParsedMessage) {
        let (Some(nick), Some(server)) = (message.arg(1), message.arg(2)) else { return };
        let casemap = self.isupport.casemapping;
        self.whois.feed_server(nick, server, casemap);
    }

    fn handle_whois_idle(&mut self, message: &ParsedMessage) {
        let Some(nick) = message.arg(1) else { return };
        let idle: u64 = message.arg(2).and_then(|s| s.parse().ok()).unwrap_or(0);
        let signon: i64 = message.arg(3).and_then(|s| s.parse().ok()).unwrap_or(0);
        let casemap = self.isupport.casemapping;
        self.whois.feed_idle(nick, idle, signon, casemap);
    }

    fn handle_whois_channels(&mut self, message: &ParsedMessage) {
        let (Some(nick), Some(channels)) = (message.arg(1), message.arg(2)) else { return };
        let prefix_chars: Vec<char> = self.isupport.prefix.iter().map(|(_, p)| *p).collect();
        let casemap = self.isupport.casemapping;
        self.whois.feed_channels(nick, channels, &prefix_chars, casemap);
    }

    fn handle_whois_account(&mut self, message: &ParsedMessage) {
        let (Some(nick), Some(account)) = (message.arg(1), message.arg(2)) else { return };
        let casemap = self.isupport.casemapping;
        self.whois.feed_account(nick, account, casemap);
    }

    fn handle_end_of_whois(&mut self, message: &ParsedMessage) {
        let Some(nick) = message.arg(1) else { return };
        let casemap = self.isupport.casemapping;
        match self.whois.finish(nick, casemap) {
            Some(response) => self.events.on_whois(&response),
            None => self.emit_error(ErrorKind::Unexpected, format!("unexpected end-of-whois for {nick}")),
        }
    }

    /// `730`/`731`: a comma-separated list of `nick[!user@host]` targets.
    fn handle_monitor_names(&mut self, message: &ParsedMessage, emit: impl Fn(&mut crate::events::Events<'a>, &str)) {
        let text = message.args.last().map(String::as_str).unwrap_or("");
        for token in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let nick = token.split('!').next().unwrap_or(token);
            emit(&mut self.events, nick);
        }
    }

    fn handle_whois_key_value(&mut self, message: &ParsedMessage) {
        let (Some(target_str), Some(key), Some(value)) = (message.arg(1), message.arg(2), message.arg(3)) else {
            return;
        };
        let target = MetadataTarget::parse(target_str, &self.isupport);
        let casemap = self.isupport.casemapping;
        self.metadata.set(&target, key, "*", Some(value), casemap);
    }

    fn handle_key_value(&mut self, message: &ParsedMessage) {
        let (Some(target_str), Some(key), Some(visibility)) = (message.arg(1), message.arg(2), message.arg(3)) else {
            return;
        };
        let value = message.arg(4);
        let target = MetadataTarget::parse(target_str, &self.isupport);
        let casemap = self.isupport.casemapping;
        self.metadata.set(&target, key, visibility, value, casemap);
    }

    fn handle_metadata_sub_ok(&mut self, message: &ParsedMessage) {
        let keys = metadata_key_list(message);
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.metadata.confirm_subscribed(&refs);
    }

    fn handle_metadata_unsub_ok(&mut self, message: &ParsedMessage) {
        let keys = metadata_key_list(message);
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.metadata.confirm_unsubscribed(&refs);
    }

    fn handle_metadata_subs(&mut self, message: &ParsedMessage) {
        let keys = metadata_key_list(message);
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.metadata.replace_subscriptions(&refs);
        self.events.on_metadata_sub_list(&keys);
    }

    /// `900 <client> <nick>!<ident>@<host> <account> :You are now logged in as <user>`
    fn handle_login(&mut self, message: &ParsedMessage) {
        let (Some(mask), Some(account)) = (message.arg(1), message.arg(2)) else { return };
        let Some(nick) = mask.split('!').next() else { return };
        self.events.on_login(nick, account);
    }

    fn emit_numeric_error(&mut self, kind: ErrorKind, message: &ParsedMessage) {
        let text = message.args.last().map(String::as_str).unwrap_or("").to_owned();
        self.emit_error(kind, text);
    }
}

/// Splits a numeric's trailing argument (its last positional arg, typically a space- or
/// comma-separated list) into owned tokens.
fn last_token_list(args: &[String]) -> Vec<String> {
    args.last().map(|s| s.split_whitespace().map(str::to_owned).collect()).unwrap_or_default()
}

/// `770`/`771`/`772`'s key list is every arg but the first (`<client>`) and the last (the
/// human-readable trailing text).
fn metadata_key_list(message: &ParsedMessage) -> Vec<String> {
    let len = message.args.len();
    if len <= 2 {
        return Vec::new();
    }
    message.args[1..len - 1].to_vec()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn metadata_uses_server_time_tag_when_present() {
        let message = ParsedMessage::parse("@time=2017-07-14T02:40:00.000Z PING :x\r\n").unwrap();
        let metadata = compute_metadata(&message);
        assert_eq!(metadata.time.timestamp(), 1_500_000_000);
        assert_eq!(metadata.tags.get("time").map(String::as_str), Some("2017-07-14T02:40:00.000Z"));
    }

    #[test]
    fn metadata_falls_back_to_local_clock_without_server_time() {
        let message = ParsedMessage::parse("PING :x\r\n").unwrap();
        let metadata = compute_metadata(&message);
        assert!(metadata.time.timestamp() > 0);
    }

    #[test]
    fn metadata_carries_batch_tag() {
        let message = ParsedMessage::parse("@batch=abc PRIVMSG #a :hi\r\n").unwrap();
        let metadata = compute_metadata(&message);
        assert_eq!(metadata.batch.as_deref(), Some("abc"));
    }
}
