//! WHOIS reply aggregation (spec §4.9, invariant 5).
use std::collections::{BTreeMap, HashMap};

use crate::isupport::CaseMapping;

/// The accumulated result of one WHOIS exchange. Emitted once, on the matching `318`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhoisResponse {
    /// The nickname this response is for (the one the 311 etc. were addressed to).
    pub nickname: String,
    /// `311`'s username field.
    pub username: Option<String>,
    /// `311`'s hostname field.
    pub hostname: Option<String>,
    /// `311`'s realname field.
    pub realname: Option<String>,
    /// Set by `313 RPL_WHOISOPERATOR`.
    pub is_oper: bool,
    /// Set by `671 RPL_WHOISSECURE`.
    pub is_secure: bool,
    /// Set by `307 RPL_WHOISREGNICK` or `330 RPL_WHOISACCOUNT`.
    pub is_registered: bool,
    /// `330`'s account name, if logged in.
    pub account: Option<String>,
    /// `312`'s server name.
    pub connected_to: Option<String>,
    /// `317`'s sign-on time, Unix seconds.
    pub connected_time: Option<i64>,
    /// `317`'s idle-seconds field.
    pub idle_time: Option<u64>,
    /// `319`'s channel list: channel name -> the prefix string the user holds there (possibly
    /// empty, possibly multiple characters under `multi-prefix`).
    pub channels: BTreeMap<String, String>,
}

/// Accumulates WHOIS numerics into one [`WhoisResponse`] per nickname in flight.
#[derive(Clone, Debug, Default)]
pub struct WhoisAggregator {
    cache: HashMap<String, WhoisResponse>,
}

impl WhoisAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> WhoisAggregator {
        WhoisAggregator::default()
    }

    fn entry(&mut self, nickname: &str, casemap: CaseMapping) -> &mut WhoisResponse {
        self.cache
            .entry(casemap.fold(nickname))
            .or_insert_with(|| WhoisResponse { nickname: nickname.to_owned(), ..WhoisResponse::default() })
    }

    /// `311 RPL_WHOISUSER`.
    pub fn feed_user(&mut self, nickname: &str, username: &str, hostname: &str, realname: &str, casemap: CaseMapping) {
        let entry = self.entry(nickname, casemap);
        entry.username = Some(username.to_owned());
        entry.hostname = Some(hostname.to_owned());
        entry.realname = Some(realname.to_owned());
    }

    /// `312 RPL_WHOISSERVER`.
    pub fn feed_server(&mut self, nickname: &str, server: &str, casemap: CaseMapping) {
        self.entry(nickname, casemap).connected_to = Some(server.to_owned());
    }

    /// `313 RPL_WHOISOPERATOR`.
    pub fn feed_operator(&mut self, nickname: &str, casemap: CaseMapping) {
        self.entry(nickname, casemap).is_oper = true;
    }

    /// `317 RPL_WHOISIDLE`.
    pub fn feed_idle(&mut self, nickname: &str, idle_seconds: u64, signon_unix: i64, casemap: CaseMapping) {
        let entry = self.entry(nickname, casemap);
        entry.idle_time = Some(idle_seconds);
        entry.connected_time = Some(signon_unix);
    }

    /// `319 RPL_WHOISCHANNELS`. `channels` is the trailing text, e.g. `"+#test #test2"`.
    pub fn feed_channels(&mut self, nickname: &str, channels: &str, prefix_chars: &[char], casemap: CaseMapping) {
        let entry = self.entry(nickname, casemap);
        for token in channels.split_whitespace() {
            let split_at = token.chars().take_while(|c| prefix_chars.contains(c)).count();
            let (prefix, name) = token.split_at(split_at);
            entry.channels.insert(name.to_owned(), prefix.to_owned());
        }
    }

    /// `330 RPL_WHOISACCOUNT`.
    pub fn feed_account(&mut self, nickname: &str, account: &str, casemap: CaseMapping) {
        let entry = self.entry(nickname, casemap);
        entry.account = Some(account.to_owned());
        entry.is_registered = true;
    }

    /// `307 RPL_WHOISREGNICK`.
    pub fn feed_registered_nick(&mut self, nickname: &str, casemap: CaseMapping) {
        self.entry(nickname, casemap).is_registered = true;
    }

    /// `378 RPL_WHOISHOST`. The connecting-host text isn't part of the accumulator's field set;
    /// this only keeps the entry alive so the aggregator recognizes the nick at `318`.
    pub fn feed_host(&mut self, nickname: &str, casemap: CaseMapping) {
        self.entry(nickname, casemap);
    }

    /// `671 RPL_WHOISSECURE`.
    pub fn feed_secure(&mut self, nickname: &str, casemap: CaseMapping) {
        self.entry(nickname, casemap).is_secure = true;
    }

    /// `318 RPL_ENDOFWHOIS`: removes and returns the accumulated response, or `None` if no
    /// accumulator exists for this nick (an `unexpected` error, per spec §4.9).
    pub fn finish(&mut self, nickname: &str, casemap: CaseMapping) -> Option<WhoisResponse> {
        self.cache.remove(&casemap.fold(nickname))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn aggregates_full_sequence_like_scenario_s4() {
        let mut whois = WhoisAggregator::new();
        let nick = "someoneElse";
        whois.feed_user(nick, "someUsername", "someHostname", "Some Real Name", CaseMapping::Ascii);
        whois.feed_server(nick, "example.net", CaseMapping::Ascii);
        whois.feed_operator(nick, CaseMapping::Ascii);
        whois.feed_idle(nick, 1000, 1_500_000_000, CaseMapping::Ascii);
        whois.feed_secure(nick, CaseMapping::Ascii);
        whois.feed_registered_nick(nick, CaseMapping::Ascii);
        whois.feed_account(nick, "someoneElseAccount", CaseMapping::Ascii);
        whois.feed_channels(nick, "+#test #test2", &['~', '&', '@', '%', '+'], CaseMapping::Ascii);

        let response = whois.finish(nick, CaseMapping::Ascii).unwrap();
        assert!(response.is_oper);
        assert!(response.is_secure);
        assert!(response.is_registered);
        assert_eq!(response.account.as_deref(), Some("someoneElseAccount"));
        assert_eq!(response.idle_time, Some(1000));
        assert_eq!(response.connected_time, Some(1_500_000_000));
        assert_eq!(response.channels.get("#test").map(String::as_str), Some("+"));
        assert_eq!(response.channels.get("#test2").map(String::as_str), Some(""));
    }

    #[test]
    fn finish_without_accumulator_returns_none() {
        let mut whois = WhoisAggregator::new();
        assert!(whois.finish("nobody", CaseMapping::Ascii).is_none());
    }

    #[test]
    fn nick_key_is_case_folded() {
        let mut whois = WhoisAggregator::new();
        whois.feed_operator("Someone", CaseMapping::Ascii);
        assert!(whois.finish("SOMEONE", CaseMapping::Ascii).unwrap().is_oper);
    }
}
