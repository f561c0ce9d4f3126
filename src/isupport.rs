//! Accumulates `005 RPL_ISUPPORT` tokens into parsed, typed server parameters (spec §4.4).
use std::collections::HashMap;

use relaychat_proto::mode::{ModeCategory, ModeCategoryMap};

/// A server's declared nickname/channel-name case-folding rule, from the `CASEMAPPING` token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseMapping {
    /// Plain ASCII folding.
    Ascii,
    /// RFC 1459: ASCII folding plus `{}|^` folding to `[]\~`.
    Rfc1459,
    /// A stricter RFC 1459 variant that also folds `~` to `^`.
    Rfc1459Strict,
}

impl CaseMapping {
    fn from_token(value: &str) -> CaseMapping {
        match value {
            "ascii" => CaseMapping::Ascii,
            "rfc1459-strict" => CaseMapping::Rfc1459Strict,
            _ => CaseMapping::Rfc1459,
        }
    }

    /// Folds `s` to its canonical lowercase form under this casemapping, for use as an address
    /// book / channel membership key.
    pub fn fold(self, s: &str) -> String {
        s.chars()
            .map(|c| match (self, c) {
                (CaseMapping::Rfc1459 | CaseMapping::Rfc1459Strict, '{') => '[',
                (CaseMapping::Rfc1459 | CaseMapping::Rfc1459Strict, '}') => ']',
                (CaseMapping::Rfc1459 | CaseMapping::Rfc1459Strict, '|') => '\\',
                (CaseMapping::Rfc1459, '^') => '~',
                (CaseMapping::Rfc1459Strict, '^') => '^',
                (_, c) => c.to_ascii_lowercase(),
            })
            .collect()
    }
}

impl Default for CaseMapping {
    fn default() -> CaseMapping {
        CaseMapping::Rfc1459
    }
}

/// Which legacy `PROTOCTL` fallback(s), if any, `feed` observed for the first time. The caller
/// (the engine) decides whether to actually send the `PROTOCTL` line, since that depends on
/// which capabilities are already negotiated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NewlyObserved {
    /// `NAMESX` was seen in this token and had not been seen before.
    pub namesx: bool,
    /// `UHNAMES` was seen in this token and had not been seen before.
    pub uhnames: bool,
}

/// The accumulated, parsed state of every `ISUPPORT` token observed so far.
#[derive(Clone, Debug)]
pub struct IsupportStore {
    /// `(mode letter, prefix char)` pairs from `PREFIX`, in descending rank order.
    pub prefix: Vec<(char, char)>,
    /// The `CHANMODES` A/B/C/D category map.
    pub chanmodes: ModeCategoryMap,
    /// Sigils a channel name may start with, from `CHANTYPES` (`#` if never declared).
    pub chantypes: Vec<char>,
    /// Prefixes usable as message-target decorations, from `STATUSMSG`.
    pub statusmsg: Vec<char>,
    /// The server's declared case-folding rule.
    pub casemapping: CaseMapping,
    /// `NICKLEN`.
    pub nicklen: Option<usize>,
    /// `KICKLEN`.
    pub kicklen: Option<usize>,
    /// `CHANNELLEN`.
    pub channellen: Option<usize>,
    /// `TOPICLEN`.
    pub topiclen: Option<usize>,
    /// `AWAYLEN`.
    pub awaylen: Option<usize>,
    /// Whether `WHOX` was declared.
    pub whox: bool,
    /// Whether `UHNAMES` was declared.
    pub uhnames: bool,
    /// Whether `NAMESX` was declared.
    pub namesx: bool,
    /// Every token observed, verbatim, including ones parsed above (useful for tokens this store
    /// doesn't specifically recognize).
    pub raw: HashMap<String, Option<String>>,
}

impl Default for IsupportStore {
    fn default() -> IsupportStore {
        IsupportStore {
            prefix: vec![('o', '@'), ('v', '+')],
            chanmodes: ModeCategoryMap::new(),
            chantypes: vec!['#'],
            statusmsg: Vec::new(),
            casemapping: CaseMapping::default(),
            nicklen: None,
            kicklen: None,
            channellen: None,
            topiclen: None,
            awaylen: None,
            whox: false,
            uhnames: false,
            namesx: false,
            raw: HashMap::new(),
        }
    }
}

impl IsupportStore {
    /// Creates a store with RFC 1459 defaults, used until the server's own `005` lines arrive.
    pub fn new() -> IsupportStore {
        IsupportStore::default()
    }

    /// Feeds one `key` or `key=value` token from a `005` line's argument list.
    pub fn feed(&mut self, token: &str) -> NewlyObserved {
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        };

        let mut newly = NewlyObserved::default();
        match (key, value) {
            ("PREFIX", Some(value)) => self.feed_prefix(value),
            ("CHANMODES", Some(value)) => self.chanmodes = ModeCategoryMap::from_chanmodes_value(value),
            ("CHANTYPES", Some(value)) => self.chantypes = value.chars().collect(),
            ("STATUSMSG", Some(value)) => self.statusmsg = value.chars().collect(),
            ("CASEMAPPING", Some(value)) => self.casemapping = CaseMapping::from_token(value),
            ("NICKLEN", Some(value)) => self.nicklen = value.parse().ok(),
            ("KICKLEN", Some(value)) => self.kicklen = value.parse().ok(),
            ("CHANNELLEN", Some(value)) => self.channellen = value.parse().ok(),
            ("TOPICLEN", Some(value)) => self.topiclen = value.parse().ok(),
            ("AWAYLEN", Some(value)) => self.awaylen = value.parse().ok(),
            ("WHOX", _) => self.whox = true,
            ("UHNAMES", _) => {
                newly.uhnames = !self.uhnames;
                self.uhnames = true;
            }
            ("NAMESX", _) => {
                newly.namesx = !self.namesx;
                self.namesx = true;
            }
            _ => {}
        }

        self.raw.insert(key.to_owned(), value.map(str::to_owned));
        newly
    }

    fn feed_prefix(&mut self, value: &str) {
        let Some(rest) = value.strip_prefix('(') else { return };
        let Some((modes, prefixes)) = rest.split_once(')') else { return };
        self.prefix = modes.chars().zip(prefixes.chars()).collect();
    }

    /// Returns the prefix char for a mode letter, if `PREFIX` declares one.
    pub fn prefix_for_mode(&self, letter: char) -> Option<char> {
        self.prefix.iter().find(|(m, _)| *m == letter).map(|(_, p)| *p)
    }

    /// Returns the membership rank (lower is higher rank) of a prefix char, used to pick the
    /// "highest" prefix a user holds in a channel.
    pub fn rank_of_prefix(&self, prefix: char) -> Option<usize> {
        self.prefix.iter().position(|(_, p)| *p == prefix)
    }

    /// Returns true if `name` starts with a declared channel-type sigil.
    pub fn is_channel_name(&self, name: &str) -> bool {
        name.chars().next().map_or(false, |c| self.chantypes.contains(&c))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_prefix_token() {
        let mut store = IsupportStore::new();
        store.feed("PREFIX=(ov)@+");
        assert_eq!(store.prefix, vec![('o', '@'), ('v', '+')]);
        assert_eq!(store.prefix_for_mode('o'), Some('@'));
        assert_eq!(store.rank_of_prefix('@'), Some(0));
        assert_eq!(store.rank_of_prefix('+'), Some(1));
    }

    #[test]
    fn parses_chanmodes_into_category_map() {
        let mut store = IsupportStore::new();
        store.feed("CHANMODES=b,k,l,imnpst");
        assert_eq!(store.chanmodes.category_of('b'), ModeCategory::A);
        assert_eq!(store.chanmodes.category_of('l'), ModeCategory::C);
    }

    #[test]
    fn parses_chantypes_and_length_limits() {
        let mut store = IsupportStore::new();
        store.feed("CHANTYPES=#&");
        store.feed("KICKLEN=307");
        assert!(store.is_channel_name("#rust"));
        assert!(store.is_channel_name("&local"));
        assert!(!store.is_channel_name("someone"));
        assert_eq!(store.kicklen, Some(307));
    }

    #[test]
    fn first_observation_of_namesx_is_reported_once() {
        let mut store = IsupportStore::new();
        assert!(store.feed("NAMESX").namesx);
        assert!(!store.feed("NAMESX").namesx);
    }

    #[test]
    fn unrecognized_tokens_are_kept_verbatim() {
        let mut store = IsupportStore::new();
        store.feed("NETWORK=Libera.Chat");
        assert_eq!(store.raw.get("NETWORK").map(Option::as_deref), Some(Some("Libera.Chat")));
    }

    #[test]
    fn rfc1459_casemapping_folds_braces_to_brackets() {
        let cm = CaseMapping::Rfc1459;
        assert_eq!(cm.fold("NICK{A}"), "nick[a]");
    }
}
