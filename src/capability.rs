//! The capability negotiation state machine (spec §4.5).
//!
//! The multi-part `CAP * LS` continuation handling (a `*` marker meaning "more to come") is
//! grounded on `vinezombie::client::cap`'s `ServerMsgArgs::combine`, adapted from that crate's
//! zero-copy `Word`/`Arg` types to this engine's owned `String`-based style.
use std::collections::HashMap;

use relaychat_proto::caps::{is_supported, Capability};

/// Where capability negotiation currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationState {
    /// `CAP LS` has been sent; still receiving (possibly multi-part) `LS` replies.
    SentLs,
    /// `CAP REQ` has been sent for the intersection of advertised and supported capabilities;
    /// waiting for all outstanding `ACK`/`NAK` replies.
    Requesting,
    /// All requests settled, but `sasl` was enabled and a SASL exchange must finish first.
    AwaitingSasl,
    /// Negotiation is complete; `CAP END` may be sent.
    Done,
}

/// Tracks advertised and enabled capabilities and the negotiation handshake's progress.
#[derive(Clone, Debug)]
pub struct CapabilityNegotiator {
    state: NegotiationState,
    available: HashMap<String, Capability>,
    enabled: HashMap<String, Capability>,
    outstanding_reqs: usize,
}

impl Default for CapabilityNegotiator {
    fn default() -> CapabilityNegotiator {
        CapabilityNegotiator {
            state: NegotiationState::SentLs,
            available: HashMap::new(),
            enabled: HashMap::new(),
            outstanding_reqs: 0,
        }
    }
}

impl CapabilityNegotiator {
    /// Creates a negotiator in its initial `SentLs` state, as if `CAP LS 302` was just sent.
    pub fn new() -> CapabilityNegotiator {
        CapabilityNegotiator::default()
    }

    /// The current negotiation state.
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Feeds one `CAP * LS [*] :caps...` reply's trailing-argument tail (everything after the
    /// `LS` subcommand token). Returns the set of supported capability names newly available to
    /// request, and whether this was the final part of a possibly multi-part reply.
    ///
    /// `args` is `["*", "cap list"]` for a continuation part, or `["cap list"]` for the final (or
    /// only) part — the `*` marker is IRCv3.2's multi-line `LS` continuation signal.
    pub fn receive_ls(&mut self, args: &[String]) -> (Vec<String>, bool) {
        let (is_continuation, caps_str) = match args {
            [marker, caps] if marker == "*" => (true, caps.as_str()),
            [caps] => (false, caps.as_str()),
            _ => (false, ""),
        };

        let mut newly_wanted = Vec::new();
        for token in caps_str.split_whitespace() {
            let cap = Capability::parse(token);
            if is_supported(&cap.name) && !self.available.contains_key(&cap.name) {
                newly_wanted.push(cap.name.clone());
            }
            self.available.insert(cap.name.clone(), cap);
        }

        if !is_continuation {
            self.state = NegotiationState::Requesting;
        }
        (newly_wanted, !is_continuation)
    }

    /// Feeds a `CAP * NEW :caps...` reply: newly available capabilities mid-session. Returns the
    /// supported subset that should now be `REQ`'d.
    pub fn receive_new(&mut self, args: &[String]) -> Vec<String> {
        let caps_str = args.last().map(String::as_str).unwrap_or("");
        let mut wanted = Vec::new();
        for token in caps_str.split_whitespace() {
            let cap = Capability::parse(token);
            if is_supported(&cap.name) {
                wanted.push(cap.name.clone());
            }
            self.available.insert(cap.name.clone(), cap);
        }
        wanted
    }

    /// Feeds a `CAP * DEL :caps...` reply: capabilities the server is revoking.
    pub fn receive_del(&mut self, args: &[String]) {
        let caps_str = args.last().map(String::as_str).unwrap_or("");
        for name in caps_str.split_whitespace() {
            self.available.remove(name);
            self.enabled.remove(name);
        }
    }

    /// Marks one `CAP REQ` line as sent and outstanding; call once per `REQ` line, regardless of
    /// how many capability names it lists, since the server replies with exactly one `ACK`/`NAK`
    /// per `REQ` it received.
    pub fn note_requested(&mut self) {
        self.outstanding_reqs += 1;
    }

    /// Feeds a `CAP * ACK :caps...` reply, enabling each named capability. This settles one
    /// outstanding `REQ` (a single `ACK` line answers a single `REQ` line, however many names it
    /// carries). Returns the names enabled by this reply.
    pub fn receive_ack(&mut self, args: &[String]) -> Vec<String> {
        let caps_str = args.last().map(String::as_str).unwrap_or("");
        let mut acked = Vec::new();
        for token in caps_str.split_whitespace() {
            let cap = self.available.get(token).cloned().unwrap_or_else(|| Capability::parse(token));
            self.enabled.insert(cap.name.clone(), cap.clone());
            acked.push(cap.name);
        }
        self.outstanding_reqs = self.outstanding_reqs.saturating_sub(1);
        acked
    }

    /// Feeds a `CAP * NAK :caps...` reply, rejecting each named capability. Settles one
    /// outstanding `REQ`, the same as `receive_ack`.
    pub fn receive_nak(&mut self, _args: &[String]) {
        self.outstanding_reqs = self.outstanding_reqs.saturating_sub(1);
    }

    /// True once every `CAP REQ` line this negotiator knows about has been answered by exactly one
    /// `ACK`/`NAK` reply.
    pub fn all_reqs_settled(&self) -> bool {
        self.outstanding_reqs == 0
    }

    /// Advances the state machine once all requests are settled. `sasl_in_flight` tells the
    /// negotiator whether a SASL exchange is still outstanding; if so, negotiation parks in
    /// `AwaitingSasl` instead of completing. Returns the resulting state.
    pub fn settle(&mut self, sasl_in_flight: bool) -> NegotiationState {
        if !self.all_reqs_settled() {
            return self.state;
        }
        self.state = if sasl_in_flight { NegotiationState::AwaitingSasl } else { NegotiationState::Done };
        self.state
    }

    /// Called once a SASL exchange (successful or not) has finished; completes negotiation if
    /// requests were already settled.
    pub fn note_sasl_finished(&mut self) {
        if self.state == NegotiationState::AwaitingSasl {
            self.state = NegotiationState::Done;
        }
    }

    /// True if `name` is currently enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains_key(name)
    }

    /// Returns the enabled capability's advertised value, if any.
    pub fn enabled_value(&self, name: &str) -> Option<&str> {
        self.enabled.get(name).and_then(|cap| cap.value.as_deref())
    }

    /// The server's advertised value for a capability, whether or not it was requested.
    pub fn available_value(&self, name: &str) -> Option<&str> {
        self.available.get(name).and_then(|cap| cap.value.as_deref())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn multi_part_ls_accumulates_until_final_part() {
        let mut neg = CapabilityNegotiator::new();
        let (wanted, done) = neg.receive_ls(&["*".into(), "multi-prefix sasl".into()]);
        assert!(!done);
        assert_eq!(wanted, vec!["multi-prefix".to_owned(), "sasl".to_owned()]);
        assert_eq!(neg.state(), NegotiationState::SentLs);

        let (wanted2, done2) = neg.receive_ls(&["server-time".into()]);
        assert!(done2);
        assert_eq!(wanted2, vec!["server-time".to_owned()]);
        assert_eq!(neg.state(), NegotiationState::Requesting);
    }

    #[test]
    fn unsupported_capabilities_are_not_wanted() {
        let mut neg = CapabilityNegotiator::new();
        let (wanted, _) = neg.receive_ls(&["znc.in/self-message".into()]);
        assert!(wanted.is_empty());
    }

    #[test]
    fn ack_enables_and_decrements_outstanding() {
        let mut neg = CapabilityNegotiator::new();
        neg.receive_ls(&["multi-prefix sasl".into()]);
        neg.note_requested();
        let acked = neg.receive_ack(&["multi-prefix sasl".into()]);
        assert_eq!(acked, vec!["multi-prefix".to_owned(), "sasl".to_owned()]);
        assert!(neg.is_enabled("multi-prefix"));
        assert!(neg.is_enabled("sasl"));
        assert!(neg.all_reqs_settled());
    }

    #[test]
    fn one_req_line_settles_on_one_ack_regardless_of_name_count() {
        let mut neg = CapabilityNegotiator::new();
        neg.receive_ls(&["multi-prefix sasl".into()]);
        neg.note_requested();
        assert!(!neg.all_reqs_settled());
        neg.receive_ack(&["multi-prefix".into()]);
        assert!(neg.all_reqs_settled());
    }

    #[test]
    fn settle_parks_on_sasl_in_flight() {
        let mut neg = CapabilityNegotiator::new();
        neg.receive_ls(&["sasl".into()]);
        neg.note_requested();
        neg.receive_ack(&["sasl".into()]);
        assert_eq!(neg.settle(true), NegotiationState::AwaitingSasl);
        neg.note_sasl_finished();
        assert_eq!(neg.state(), NegotiationState::Done);
    }

    #[test]
    fn settle_completes_immediately_without_sasl() {
        let mut neg = CapabilityNegotiator::new();
        neg.receive_ls(&["multi-prefix".into()]);
        neg.note_requested();
        neg.receive_ack(&["multi-prefix".into()]);
        assert_eq!(neg.settle(false), NegotiationState::Done);
    }

    #[test]
    fn del_removes_from_available_and_enabled() {
        let mut neg = CapabilityNegotiator::new();
        neg.receive_ls(&["away-notify".into()]);
        neg.note_requested();
        neg.receive_ack(&["away-notify".into()]);
        neg.receive_del(&["away-notify".into()]);
        assert!(!neg.is_enabled("away-notify"));
    }
}
