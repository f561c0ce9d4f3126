//! The SASL authentication driver (spec §4.6).
//!
//! The teacher's own SASL support (`client::ext::send_sasl_plain` and friends) never actually
//! encodes a payload — it sends the bare mechanism literal and stops there. The base64 chunking
//! and payload construction below is grounded instead on `sid3xyz/slirc-proto`'s real `base64`
//! dependency, the one piece of this engine's dependency stack adopted from a sibling example
//! repo rather than the teacher (see `DESIGN.md`).
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// The maximum length, in bytes, of one `AUTHENTICATE` chunk's base64 payload before it must be
/// split across multiple lines.
const CHUNK_LEN: usize = 400;

/// One step of a SASL mechanism's response to a (possibly empty) server challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaslStep {
    /// Send this payload as the next client response.
    Respond(Vec<u8>),
    /// This mechanism has nothing further to send.
    Done,
}

/// A SASL mechanism: a name the server can select by, and a challenge/response function.
pub trait SaslMechanism {
    /// The mechanism's name, as advertised in `sasl=<names>` and sent in `AUTHENTICATE <name>`.
    fn name(&self) -> &str;

    /// Produces the next client payload in response to a decoded server challenge (empty for the
    /// initial prompt).
    fn respond(&mut self, challenge: &[u8]) -> SaslStep;
}

/// `PLAIN`: `authzid \0 authcid \0 password`, a single response then done.
pub struct Plain {
    authzid: String,
    authcid: String,
    password: String,
    responded: bool,
}

impl Plain {
    /// Creates a `PLAIN` mechanism. `authzid` is typically the same as `authcid`.
    pub fn new(authzid: impl Into<String>, authcid: impl Into<String>, password: impl Into<String>) -> Plain {
        Plain { authzid: authzid.into(), authcid: authcid.into(), password: password.into(), responded: false }
    }
}

impl SaslMechanism for Plain {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn respond(&mut self, _challenge: &[u8]) -> SaslStep {
        if self.responded {
            return SaslStep::Done;
        }
        self.responded = true;
        let mut payload = Vec::with_capacity(self.authzid.len() + self.authcid.len() + self.password.len() + 2);
        payload.extend_from_slice(self.authzid.as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.authcid.as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.password.as_bytes());
        SaslStep::Respond(payload)
    }
}

/// `EXTERNAL`: a single empty response (the server derives identity from the TLS client
/// certificate) then done.
#[derive(Default)]
pub struct External {
    responded: bool,
}

impl External {
    /// Creates an `EXTERNAL` mechanism.
    pub fn new() -> External {
        External::default()
    }
}

impl SaslMechanism for External {
    fn name(&self) -> &str {
        "EXTERNAL"
    }

    fn respond(&mut self, _challenge: &[u8]) -> SaslStep {
        if self.responded {
            return SaslStep::Done;
        }
        self.responded = true;
        SaslStep::Respond(Vec::new())
    }
}

/// How a SASL exchange concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaslOutcome {
    /// `903 RPL_SASLSUCCESS`.
    Success,
    /// `902`/`904`/`905`/`906`: locked, failed, too long, or aborted.
    Failure,
}

enum DriverState {
    Idle,
    Authenticating { mechanism_index: usize, buffer: String },
    Finished(SaslOutcome),
}

/// Drives a SASL exchange against a borrowed list of client mechanisms (spec §4.6 steps 1-5).
pub struct SaslDriver<'a> {
    mechanisms: &'a mut [Box<dyn SaslMechanism>],
    state: DriverState,
}

impl<'a> SaslDriver<'a> {
    /// Creates a driver over a borrowed mechanism list, in preference order.
    pub fn new(mechanisms: &'a mut [Box<dyn SaslMechanism>]) -> SaslDriver<'a> {
        SaslDriver { mechanisms, state: DriverState::Idle }
    }

    /// Picks a mechanism given the server's advertised list (from `sasl=<names>`, comma-split).
    /// An empty list means legacy `sasl` 3.1 with no mechanism advertisement, in which case the
    /// client's first configured mechanism is used. Returns the chosen mechanism's name, to be
    /// sent as `AUTHENTICATE <name>` (step 2).
    pub fn begin(&mut self, server_mechanisms: &[&str]) -> Option<String> {
        let index = if server_mechanisms.is_empty() {
            if self.mechanisms.is_empty() {
                return None;
            }
            0
        } else {
            self.mechanisms
                .iter()
                .position(|m| server_mechanisms.iter().any(|s| s.eq_ignore_ascii_case(m.name())))?
        };
        self.state = DriverState::Authenticating { mechanism_index: index, buffer: String::new() };
        Some(self.mechanisms[index].name().to_owned())
    }

    /// Feeds one inbound `AUTHENTICATE <chunk>` line (step 3). Returns the fully assembled,
    /// decoded challenge once available — `Some(vec![])` for the common bare `+` prompt, `None`
    /// while still accumulating a multi-line payload.
    pub fn receive_chunk(&mut self, chunk: &str) -> Option<Vec<u8>> {
        let DriverState::Authenticating { buffer, .. } = &mut self.state else { return None };

        if chunk == "+" && buffer.is_empty() {
            return Some(Vec::new());
        }
        if chunk == "+" {
            let decoded = BASE64.decode(buffer.as_bytes()).unwrap_or_default();
            buffer.clear();
            return Some(decoded);
        }

        buffer.push_str(chunk);
        if chunk.len() < CHUNK_LEN {
            let decoded = BASE64.decode(buffer.as_bytes()).unwrap_or_default();
            buffer.clear();
            return Some(decoded);
        }
        None
    }

    /// Produces the next client response to a fully-assembled challenge (step 4), as one or more
    /// `AUTHENTICATE` line payloads, base64-encoded and chunked at [`CHUNK_LEN`] with a trailing
    /// `+` if the last chunk was exactly that long. Returns no lines once the mechanism is done.
    pub fn respond(&mut self, challenge: &[u8]) -> Vec<String> {
        let DriverState::Authenticating { mechanism_index, .. } = &self.state else { return Vec::new() };
        let index = *mechanism_index;
        match self.mechanisms[index].respond(challenge) {
            SaslStep::Respond(payload) => chunk_payload(&payload),
            SaslStep::Done => Vec::new(),
        }
    }

    /// Records the numeric outcome of the exchange (step 5). After this, [`SaslDriver::outcome`]
    /// reports the result and the exchange is no longer in flight.
    pub fn finish(&mut self, outcome: SaslOutcome) {
        self.state = DriverState::Finished(outcome);
    }

    /// True while a mechanism has been chosen and no outcome has been recorded yet.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, DriverState::Authenticating { .. })
    }

    /// The recorded outcome, if the exchange has finished.
    pub fn outcome(&self) -> Option<SaslOutcome> {
        match self.state {
            DriverState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}

fn chunk_payload(payload: &[u8]) -> Vec<String> {
    let encoded = BASE64.encode(payload);
    if encoded.is_empty() {
        return vec!["+".to_owned()];
    }
    let bytes = encoded.as_bytes();
    let mut chunks: Vec<String> =
        bytes.chunks(CHUNK_LEN).map(|c| String::from_utf8(c.to_vec()).expect("base64 is ascii")).collect();
    if matches!(chunks.last(), Some(last) if last.len() == CHUNK_LEN) {
        chunks.push("+".to_owned());
    }
    chunks
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_payload_matches_scenario_s6() {
        let mut plain = Plain::new("jilles", "jilles", "sesame");
        let SaslStep::Respond(payload) = plain.respond(&[]) else { panic!("expected a response") };
        assert_eq!(BASE64.encode(&payload), "amlsbGVzAGppbGxlcwBzZXNhbWU=");
        assert_eq!(plain.respond(&[]), SaslStep::Done);
    }

    #[test]
    fn external_responds_once_with_empty_payload() {
        let mut ext = External::new();
        assert_eq!(ext.respond(&[]), SaslStep::Respond(Vec::new()));
        assert_eq!(ext.respond(&[]), SaslStep::Done);
    }

    #[test]
    fn begin_picks_matching_mechanism_from_server_list() {
        let mut mechs: Vec<Box<dyn SaslMechanism>> = vec![Box::new(Plain::new("a", "a", "pw"))];
        let mut driver = SaslDriver::new(&mut mechs);
        let chosen = driver.begin(&["EXTERNAL", "PLAIN"]).unwrap();
        assert_eq!(chosen, "PLAIN");
    }

    #[test]
    fn begin_picks_first_client_mechanism_when_server_list_is_empty() {
        let mut mechs: Vec<Box<dyn SaslMechanism>> = vec![Box::new(Plain::new("a", "a", "pw"))];
        let mut driver = SaslDriver::new(&mut mechs);
        assert_eq!(driver.begin(&[]).unwrap(), "PLAIN");
    }

    #[test]
    fn bare_plus_prompt_yields_empty_challenge() {
        let mut mechs: Vec<Box<dyn SaslMechanism>> = vec![Box::new(Plain::new("a", "a", "pw"))];
        let mut driver = SaslDriver::new(&mut mechs);
        driver.begin(&[]);
        assert_eq!(driver.receive_chunk("+"), Some(Vec::new()));
    }

    #[test]
    fn multi_chunk_challenge_assembles_across_lines() {
        let mut mechs: Vec<Box<dyn SaslMechanism>> = vec![Box::new(Plain::new("a", "a", "pw"))];
        let mut driver = SaslDriver::new(&mut mechs);
        driver.begin(&[]);
        let full = BASE64.encode(vec![b'x'; 500]);
        let (first, second) = full.split_at(400);
        assert_eq!(driver.receive_chunk(first), None);
        let decoded = driver.receive_chunk(second).unwrap();
        assert_eq!(decoded, vec![b'x'; 500]);
    }

    #[test]
    fn chunk_payload_adds_trailing_plus_when_exact_multiple() {
        let payload = vec![0u8; 300];
        let chunks = chunk_payload(&payload);
        assert_eq!(chunks.last().unwrap(), "+");
    }

    #[test]
    fn finish_records_outcome_and_ends_flight() {
        let mut mechs: Vec<Box<dyn SaslMechanism>> = vec![Box::new(Plain::new("a", "a", "pw"))];
        let mut driver = SaslDriver::new(&mut mechs);
        driver.begin(&[]);
        assert!(driver.is_in_flight());
        driver.finish(SaslOutcome::Success);
        assert!(!driver.is_in_flight());
        assert_eq!(driver.outcome(), Some(SaslOutcome::Success));
    }
}
