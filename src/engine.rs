//! The central, single-threaded, synchronous engine (spec §5/§6).
use std::collections::BTreeMap;
use std::io::Write;

use relaychat_proto::command::{CapSubCommand, Command, MetadataSubCommand, MonitorSubCommand};
use relaychat_proto::message::ParsedMessage;

use crate::address_book::AddressBook;
use crate::batch::{BatchFramer, Unit};
use crate::capability::CapabilityNegotiator;
use crate::error::{EngineError, ErrorKind, Result};
use crate::events::Events;
use crate::identity::Identity;
use crate::isupport::IsupportStore;
use crate::metadata::{MetadataStore, MetadataTarget};
use crate::outgoing;
use crate::sasl::{SaslDriver, SaslMechanism};
use crate::whois::WhoisAggregator;

/// The engine: an I/O-agnostic IRCv3 client protocol state machine.
///
/// An `Engine` borrows its output sink and SASL mechanism list for its own lifetime (spec §5),
/// owns every other piece of session state, and exposes exactly two synchronous entry points to
/// an embedder: [`Engine::push`] (feed one line in) and the family of command methods below
/// (issue one line out). Neither spawns a task; both must be serialized by the caller.
pub struct Engine<'a, W: Write> {
    sink: &'a mut W,
    pub(crate) identity: Identity,
    pub(crate) self_nick: String,
    pub(crate) address_book: AddressBook,
    pub(crate) isupport: IsupportStore,
    pub(crate) caps: CapabilityNegotiator,
    pub(crate) sasl: SaslDriver<'a>,
    batch_framer: BatchFramer,
    pub(crate) whois: WhoisAggregator,
    pub(crate) metadata: MetadataStore,
    pub(crate) events: Events<'a>,
    pub(crate) registered: bool,
    invalidated: bool,
    pub(crate) connect_fired: bool,
    pub(crate) pending_cap_requests: Vec<String>,
}

impl<'a, W: Write> Engine<'a, W> {
    /// Constructs an engine and immediately sends the registration preamble: `CAP LS 302`,
    /// `PASS` (if `identity` carries one), `NICK`, then `USER` — matching testable scenario S1's
    /// expected outgoing order.
    pub fn new(sink: &'a mut W, identity: Identity, sasl_mechanisms: &'a mut [Box<dyn SaslMechanism>]) -> Engine<'a, W> {
        let self_nick = identity.nickname.clone();
        let cap_ls = Command::CAP(CapSubCommand::LS, Some("302".into()));
        let pass_cmd = identity.password.clone().map(Command::PASS);
        let nick_cmd = Command::NICK(identity.nickname.clone());
        let user_cmd = Command::USER(identity.username.clone(), "0".into(), identity.realname.clone());

        let mut engine = Engine {
            sink,
            identity,
            self_nick,
            address_book: AddressBook::new(),
            isupport: IsupportStore::new(),
            caps: CapabilityNegotiator::new(),
            sasl: SaslDriver::new(sasl_mechanisms),
            batch_framer: BatchFramer::new(),
            whois: WhoisAggregator::new(),
            metadata: MetadataStore::new(),
            events: Events::new(),
            registered: false,
            invalidated: false,
            connect_fired: false,
            pending_cap_requests: Vec::new(),
        };

        engine.auto_send(cap_ls);
        if let Some(pass_cmd) = pass_cmd {
            engine.auto_send(pass_cmd);
        }
        engine.auto_send(nick_cmd);
        engine.auto_send(user_cmd);
        engine
    }

    /// The event registry. Register callbacks on this before driving the engine with `push`.
    pub fn events(&mut self) -> &mut Events<'a> {
        &mut self.events
    }

    /// The address book of every currently known user and joined channel.
    pub fn address_book(&self) -> &AddressBook {
        &self.address_book
    }

    /// The accumulated `ISUPPORT` state.
    pub fn isupport(&self) -> &IsupportStore {
        &self.isupport
    }

    /// The METADATA key/value store and subscription set.
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// True once `RPL_WELCOME` has been observed and registration has completed.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// True once `quit()` has released this engine's state. Further `push` calls are a
    /// programmer error (spec §7).
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Feeds one line (CR/LF optional; anything after the first CR/LF is discarded). This is the
    /// engine's sole input entry point.
    pub fn push(&mut self, line: &str) {
        debug_assert!(!self.invalidated, "push() called after quit(): the embedder must not push more lines");

        match ParsedMessage::parse(line) {
            Ok(message) => {
                if let Some(unit) = self.batch_framer.push(message) {
                    self.dispatch_unit(unit);
                }
            }
            Err(err) => self.emit_error(ErrorKind::Malformed, err.to_string()),
        }
    }

    /// Sends `QUIT` and flips the invalidation flag. Further `push` calls after this are a
    /// programmer error.
    pub fn quit(&mut self, reason: Option<&str>) {
        if self.invalidated {
            return;
        }
        self.auto_send(Command::QUIT(reason.map(String::from)));
        self.invalidated = true;
    }

    pub(crate) fn emit_error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let error = EngineError::new(kind, message);
        self.events.on_error(&error);
    }

    /// Validates and sends an embedder-issued command, surfacing domain-invariant violations
    /// (spec §4.11) as an `Err` rather than silently dropping the line.
    fn issue(&mut self, command: Command) -> Result<()> {
        let line = outgoing::format_line(&command, &BTreeMap::new(), &self.caps, &self.isupport)?;
        self.write_raw(&line);
        Ok(())
    }

    /// Sends an engine-originated command (registration preamble, `CAP REQ`/`END`,
    /// `AUTHENTICATE`, `PONG`, legacy `PROTOCTL`). Formatting failures here are a bug in this
    /// engine, not a caller error, so they are logged rather than surfaced.
    pub(crate) fn auto_send(&mut self, command: Command) {
        if let Err(err) = self.issue(command) {
            log::warn!("engine failed to auto-send a command: {err}");
        }
    }

    fn write_raw(&mut self, line: &str) {
        if let Err(err) = self.sink.write_all(line.as_bytes()) {
            log::warn!("failed writing outgoing line: {err}");
            return;
        }
        let _ = self.sink.flush();
        self.events.on_send(line.trim_end_matches(['\r', '\n']));
    }

    fn dispatch_unit(&mut self, unit: Unit) {
        match unit {
            Unit::Message(message) => self.dispatch_message(message),
            Unit::Batch(batch) => {
                for message in batch.flatten() {
                    self.dispatch_message(message.clone());
                }
            }
        }
    }

    /// Advances capability/SASL negotiation's completion check, sending `CAP END` and firing
    /// `onConnect` once every precondition in testable property 6 holds.
    pub(crate) fn maybe_complete_negotiation(&mut self) {
        let sasl_in_flight = self.sasl.is_in_flight();
        if self.caps.settle(sasl_in_flight) == crate::capability::NegotiationState::Done {
            self.auto_send(Command::CAP(CapSubCommand::END, None));
        }
        self.maybe_fire_connect();
    }

    pub(crate) fn maybe_fire_connect(&mut self) {
        if self.connect_fired {
            return;
        }
        if self.registered && self.caps.all_reqs_settled() && !self.sasl.is_in_flight() {
            self.connect_fired = true;
            self.events.on_connect();
        }
    }

    // -- Public command API (spec §4.11) ------------------------------------------------------

    /// `JOIN chanlist [chankeys]`.
    pub fn join(&mut self, channels: &str, keys: Option<&str>) -> Result<()> {
        self.issue(Command::JOIN(channels.to_owned(), keys.map(String::from)))
    }

    /// `PART chanlist :[comment]`.
    pub fn part(&mut self, channels: &str, message: Option<&str>) -> Result<()> {
        self.issue(Command::PART(channels.to_owned(), message.map(String::from)))
    }

    /// `PRIVMSG msgtarget :message`.
    pub fn privmsg(&mut self, target: &str, text: &str) -> Result<()> {
        self.issue(Command::PRIVMSG(target.to_owned(), text.to_owned()))
    }

    /// `NOTICE msgtarget :message`.
    pub fn notice(&mut self, target: &str, text: &str) -> Result<()> {
        self.issue(Command::NOTICE(target.to_owned(), text.to_owned()))
    }

    /// `TAGMSG msgtarget`.
    pub fn tagmsg(&mut self, target: &str) -> Result<()> {
        self.issue(Command::TAGMSG(target.to_owned()))
    }

    /// `TOPIC channel :[topic]`.
    pub fn topic(&mut self, channel: &str, topic: Option<&str>) -> Result<()> {
        self.issue(Command::TOPIC(channel.to_owned(), topic.map(String::from)))
    }

    /// `MODE target [modes [modeparams]]`.
    pub fn mode(&mut self, target: &str, modes: &str, args: &[&str]) -> Result<()> {
        self.issue(Command::MODE(target.to_owned(), modes.to_owned(), args.iter().map(|s| (*s).to_owned()).collect()))
    }

    /// `WHO mask`.
    pub fn who(&mut self, mask: &str) -> Result<()> {
        self.issue(Command::WHO(mask.to_owned()))
    }

    /// `WHOIS target`.
    pub fn whois(&mut self, target: &str) -> Result<()> {
        self.issue(Command::WHOIS(target.to_owned()))
    }

    /// `WALLOPS :text`.
    pub fn wallops(&mut self, text: &str) -> Result<()> {
        self.issue(Command::WALLOPS(text.to_owned()))
    }

    /// `KICK chanlist userlist :[comment]`. Rejected if `comment` exceeds the server's
    /// `KICKLEN`.
    pub fn kick(&mut self, channel: &str, nick: &str, reason: Option<&str>) -> Result<()> {
        self.issue(Command::KICK(channel.to_owned(), nick.to_owned(), reason.map(String::from)))
    }

    /// `OPER name :password`. Rejected if either operand contains a space.
    pub fn oper(&mut self, name: &str, password: &str) -> Result<()> {
        self.issue(Command::OPER(name.to_owned(), password.to_owned()))
    }

    /// `REHASH`.
    pub fn rehash(&mut self) -> Result<()> {
        self.issue(Command::REHASH)
    }

    /// `RESTART`.
    pub fn restart(&mut self) -> Result<()> {
        self.issue(Command::RESTART)
    }

    /// `SQUIT server :comment`. Rejected if `server` contains a space.
    pub fn squit(&mut self, server: &str, comment: &str) -> Result<()> {
        self.issue(Command::SQUIT(server.to_owned(), comment.to_owned()))
    }

    /// `VERSION :[target]`.
    pub fn version(&mut self, target: Option<&str>) -> Result<()> {
        self.issue(Command::VERSION(target.map(String::from)))
    }

    /// `ADMIN :[target]`.
    pub fn admin(&mut self, target: Option<&str>) -> Result<()> {
        self.issue(Command::ADMIN(target.map(String::from)))
    }

    /// `AWAY :[message]`. No message marks the self user back from away.
    pub fn away(&mut self, message: Option<&str>) -> Result<()> {
        self.issue(Command::AWAY(message.map(String::from)))
    }

    /// `ISON nicklist`.
    pub fn ison(&mut self, nicks: &[&str]) -> Result<()> {
        self.issue(Command::ISON(nicks.iter().map(|s| (*s).to_owned()).collect()))
    }

    /// `LIST [chanlist]`.
    pub fn list(&mut self, channels: Option<&str>) -> Result<()> {
        self.issue(Command::LIST(channels.map(String::from)))
    }

    /// `LUSERS`.
    pub fn lusers(&mut self) -> Result<()> {
        self.issue(Command::LUSERS(None, None))
    }

    /// `NAMES [chanlist]`.
    pub fn names(&mut self, channels: Option<&str>) -> Result<()> {
        self.issue(Command::NAMES(channels.map(String::from)))
    }

    /// `PING :server`.
    pub fn ping(&mut self, server: &str) -> Result<()> {
        self.issue(Command::PING(server.to_owned()))
    }

    /// `PONG :server`.
    pub fn pong(&mut self, server: &str) -> Result<()> {
        self.issue(Command::PONG(server.to_owned()))
    }

    /// `MONITOR +target[,target2]*`.
    pub fn monitor_add(&mut self, targets: &[&str]) -> Result<()> {
        self.issue(Command::MONITOR(MonitorSubCommand::Add, Some(targets.iter().map(|s| (*s).to_owned()).collect())))
    }

    /// `MONITOR -target[,target2]*`.
    pub fn monitor_remove(&mut self, targets: &[&str]) -> Result<()> {
        self.issue(Command::MONITOR(MonitorSubCommand::Remove, Some(targets.iter().map(|s| (*s).to_owned()).collect())))
    }

    /// `MONITOR C`.
    pub fn monitor_clear(&mut self) -> Result<()> {
        self.issue(Command::MONITOR(MonitorSubCommand::Clear, None))
    }

    /// `MONITOR L`.
    pub fn monitor_list(&mut self) -> Result<()> {
        self.issue(Command::MONITOR(MonitorSubCommand::List, None))
    }

    /// `MONITOR S`.
    pub fn monitor_status(&mut self) -> Result<()> {
        self.issue(Command::MONITOR(MonitorSubCommand::Status, None))
    }

    /// `METADATA target GET key[ key2 ...]`.
    pub fn metadata_get(&mut self, target: &str, keys: &[&str]) -> Result<()> {
        self.issue(Command::METADATA(
            target.to_owned(),
            MetadataSubCommand::GET,
            keys.iter().map(|s| (*s).to_owned()).collect(),
        ))
    }

    /// `METADATA target LIST`.
    pub fn metadata_list(&mut self, target: &str) -> Result<()> {
        self.issue(Command::METADATA(target.to_owned(), MetadataSubCommand::LIST, Vec::new()))
    }

    /// `METADATA target SET key visibility [:value]`.
    pub fn metadata_set(&mut self, target: &str, key: &str, visibility: &str, value: Option<&str>) -> Result<()> {
        let mut params = vec![key.to_owned(), visibility.to_owned()];
        if let Some(value) = value {
            params.push(format!(":{value}"));
        }
        self.issue(Command::METADATA(target.to_owned(), MetadataSubCommand::SET, params))
    }

    /// `METADATA target SUB key[ key2 ...]`.
    pub fn metadata_sub(&mut self, target: &str, keys: &[&str]) -> Result<()> {
        self.issue(Command::METADATA(
            target.to_owned(),
            MetadataSubCommand::SUB,
            keys.iter().map(|s| (*s).to_owned()).collect(),
        ))
    }

    /// `METADATA target UNSUB key[ key2 ...]`.
    pub fn metadata_unsub(&mut self, target: &str, keys: &[&str]) -> Result<()> {
        self.issue(Command::METADATA(
            target.to_owned(),
            MetadataSubCommand::UNSUB,
            keys.iter().map(|s| (*s).to_owned()).collect(),
        ))
    }

    /// `METADATA target SUBS`.
    pub fn metadata_subs(&mut self, target: &str) -> Result<()> {
        self.issue(Command::METADATA(target.to_owned(), MetadataSubCommand::SUBS, Vec::new()))
    }

    /// `METADATA target SYNC`.
    pub fn metadata_sync(&mut self, target: &str) -> Result<()> {
        self.issue(Command::METADATA(target.to_owned(), MetadataSubCommand::SYNC, Vec::new()))
    }

    /// `METADATA target CLEAR`.
    pub fn metadata_clear(&mut self, target: &str) -> Result<()> {
        self.issue(Command::METADATA(target.to_owned(), MetadataSubCommand::CLEAR, Vec::new()))
    }
}
