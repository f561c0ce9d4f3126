//! A joined channel and its membership (spec §3 `Channel`).
use std::collections::BTreeMap;

/// A channel's membership: case-folded nickname key -> the prefix string currently held there
/// (e.g. `"@"`, `"+"`, `""`, or `"@+"` under `multi-prefix`).
///
/// Members are referenced only by key, never by a back-edge to the address book's `User` (Design
/// Notes §9: "channels reference users only by key").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    /// The channel name, including its sigil.
    pub name: String,
    /// The current topic, if known.
    pub topic: Option<String>,
    /// Who set the topic and when, if known (from `333 RPL_TOPICWHOTIME`).
    pub topic_who_time: Option<(String, String)>,
    /// Channel modes currently believed set, keyed by letter, value is the mode's argument if
    /// any (list-category modes like `+b` are not tracked here; they're query-only via `MODE`).
    pub modes: BTreeMap<char, Option<String>>,
    /// Case-folded nickname -> prefix string membership map.
    pub members: BTreeMap<String, String>,
}

impl Channel {
    /// Creates an empty channel record for `name`.
    pub fn new(name: impl Into<String>) -> Channel {
        Channel { name: name.into(), ..Channel::default() }
    }

    /// Adds or updates a member's prefix string.
    pub fn upsert_member(&mut self, folded_nick: impl Into<String>, prefix: impl Into<String>) {
        self.members.insert(folded_nick.into(), prefix.into());
    }

    /// Removes a member, e.g. on PART/KICK/QUIT.
    pub fn remove_member(&mut self, folded_nick: &str) -> Option<String> {
        self.members.remove(folded_nick)
    }

    /// Re-keys a member from its old folded nick to a new one, preserving its prefix.
    pub fn rename_member(&mut self, old_folded: &str, new_folded: &str) {
        if let Some(prefix) = self.members.remove(old_folded) {
            self.members.insert(new_folded.to_owned(), prefix);
        }
    }

    /// True if `folded_nick` currently holds membership.
    pub fn has_member(&self, folded_nick: &str) -> bool {
        self.members.contains_key(folded_nick)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn membership_lifecycle() {
        let mut chan = Channel::new("#rust");
        chan.upsert_member("someone", "@");
        assert!(chan.has_member("someone"));
        chan.rename_member("someone", "someoneelse");
        assert!(!chan.has_member("someone"));
        assert_eq!(chan.members.get("someoneelse").map(String::as_str), Some("@"));
        chan.remove_member("someoneelse");
        assert!(!chan.has_member("someoneelse"));
    }
}
