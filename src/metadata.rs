//! The METADATA key/value subsystem (spec §4.10).
use std::collections::{BTreeSet, HashMap};

use crate::isupport::{CaseMapping, IsupportStore};

/// One stored metadata value: its declared visibility and payload. Absence of a value (a
/// `METADATA`/`761` line with no trailing) is a delete, represented by removing the key rather
/// than storing `value: None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataValue {
    /// The visibility token the server/client declared (e.g. `*`, `public`).
    pub visibility: String,
    /// The stored value.
    pub value: String,
}

/// Which entity a `METADATA` target string names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataTarget {
    /// `*`: the self user.
    SelfUser,
    /// Any other non-channel target: another user's nickname.
    User(String),
    /// A channel-typed target.
    Channel(String),
}

impl MetadataTarget {
    /// Resolves a raw target string against the current `CHANTYPES` set.
    pub fn parse(raw: &str, isupport: &IsupportStore) -> MetadataTarget {
        if raw == "*" {
            MetadataTarget::SelfUser
        } else if isupport.is_channel_name(raw) {
            MetadataTarget::Channel(raw.to_owned())
        } else {
            MetadataTarget::User(raw.to_owned())
        }
    }
}

/// The two KV maps (`userMetadata`, `channelMetadata`) plus the self user's own metadata, the
/// local subscription set, and server-declared `draft/metadata-2` limits.
#[derive(Clone, Debug, Default)]
pub struct MetadataStore {
    self_metadata: HashMap<String, MetadataValue>,
    user_metadata: HashMap<String, HashMap<String, MetadataValue>>,
    channel_metadata: HashMap<String, HashMap<String, MetadataValue>>,
    subscriptions: BTreeSet<String>,
    /// `draft/metadata-2`'s `maxsub=`, if declared; unbounded if `None`.
    pub max_subscriptions: Option<usize>,
    /// `draft/metadata-2`'s `maxkey=`, if declared; unbounded if `None`.
    pub max_key_length: Option<usize>,
}

impl MetadataStore {
    /// Creates an empty store with unbounded limits.
    pub fn new() -> MetadataStore {
        MetadataStore::default()
    }

    /// Parses a `draft/metadata-2` capability value (e.g. `maxsub=50,maxkey=25`) into this
    /// store's declared limits.
    pub fn apply_cap_value(&mut self, value: &str) {
        for pair in value.split(',') {
            if let Some((key, val)) = pair.split_once('=') {
                match key {
                    "maxsub" => self.max_subscriptions = val.parse().ok(),
                    "maxkey" => self.max_key_length = val.parse().ok(),
                    _ => {}
                }
            }
        }
    }

    fn map_for(&mut self, target: &MetadataTarget, casemap: CaseMapping) -> &mut HashMap<String, MetadataValue> {
        match target {
            MetadataTarget::SelfUser => &mut self.self_metadata,
            MetadataTarget::User(nick) => self.user_metadata.entry(casemap.fold(nick)).or_default(),
            MetadataTarget::Channel(name) => self.channel_metadata.entry(casemap.fold(name)).or_default(),
        }
    }

    /// Sets (or, with `value: None`, deletes) one key for `target`.
    pub fn set(&mut self, target: &MetadataTarget, key: &str, visibility: &str, value: Option<&str>, casemap: CaseMapping) {
        let map = self.map_for(target, casemap);
        match value {
            Some(value) => {
                map.insert(key.to_owned(), MetadataValue { visibility: visibility.to_owned(), value: value.to_owned() });
            }
            None => {
                map.remove(key);
            }
        }
    }

    /// Reads one key for `target`.
    pub fn get(&self, target: &MetadataTarget, key: &str, casemap: CaseMapping) -> Option<&MetadataValue> {
        match target {
            MetadataTarget::SelfUser => self.self_metadata.get(key),
            MetadataTarget::User(nick) => self.user_metadata.get(&casemap.fold(nick))?.get(key),
            MetadataTarget::Channel(name) => self.channel_metadata.get(&casemap.fold(name))?.get(key),
        }
    }

    /// Applies a `770 RPL_METADATASUBOK` reply: the named keys are now subscribed.
    pub fn confirm_subscribed(&mut self, keys: &[&str]) {
        for key in keys {
            self.subscriptions.insert((*key).to_owned());
        }
    }

    /// Applies a `771 RPL_METADATAUNSUBOK` reply: the named keys are no longer subscribed.
    pub fn confirm_unsubscribed(&mut self, keys: &[&str]) {
        for key in keys {
            self.subscriptions.remove(*key);
        }
    }

    /// Applies a `772 RPL_METADATASUBS` reply: replaces the subscription set wholesale with the
    /// server's authoritative list.
    pub fn replace_subscriptions(&mut self, keys: &[&str]) {
        self.subscriptions = keys.iter().map(|s| (*s).to_owned()).collect();
    }

    /// The currently-subscribed key set.
    pub fn subscriptions(&self) -> &BTreeSet<String> {
        &self.subscriptions
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cap_value_sets_limits() {
        let mut store = MetadataStore::new();
        store.apply_cap_value("maxsub=50,maxkey=25");
        assert_eq!(store.max_subscriptions, Some(50));
        assert_eq!(store.max_key_length, Some(25));
    }

    #[test]
    fn set_and_get_self_metadata() {
        let mut store = MetadataStore::new();
        store.set(&MetadataTarget::SelfUser, "avatar", "*", Some("https://x"), CaseMapping::Ascii);
        let value = store.get(&MetadataTarget::SelfUser, "avatar", CaseMapping::Ascii).unwrap();
        assert_eq!(value.value, "https://x");
    }

    #[test]
    fn absent_value_deletes_key() {
        let mut store = MetadataStore::new();
        store.set(&MetadataTarget::SelfUser, "avatar", "*", Some("x"), CaseMapping::Ascii);
        store.set(&MetadataTarget::SelfUser, "avatar", "*", None, CaseMapping::Ascii);
        assert!(store.get(&MetadataTarget::SelfUser, "avatar", CaseMapping::Ascii).is_none());
    }

    #[test]
    fn subscription_lifecycle_matches_scenario_s5() {
        let mut store = MetadataStore::new();
        store.apply_cap_value("maxsub=50,maxkey=25");
        store.confirm_subscribed(&["avatar", "website", "foo", "bar", "baz"]);
        assert_eq!(store.subscriptions().len(), 5);
        store.confirm_unsubscribed(&["bar", "foo"]);
        assert_eq!(store.subscriptions().len(), 3);
        assert!(!store.subscriptions().contains("foo"));
    }

    #[test]
    fn target_resolution_distinguishes_channel_from_user() {
        let isupport = IsupportStore::new();
        assert_eq!(MetadataTarget::parse("*", &isupport), MetadataTarget::SelfUser);
        assert_eq!(MetadataTarget::parse("#rust", &isupport), MetadataTarget::Channel("#rust".into()));
        assert_eq!(MetadataTarget::parse("someone", &isupport), MetadataTarget::User("someone".into()));
    }
}
