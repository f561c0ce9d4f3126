//! The authoritative store of known users and joined channels (spec §4.7, invariants 1-2).
use std::collections::HashMap;

use crate::channel::Channel;
use crate::isupport::CaseMapping;
use crate::user::User;

/// Owns every `User` the engine currently knows about, and every joined `Channel`'s membership.
///
/// Keyed by case-folded nickname/channel name so renames and casemapping changes never strand
/// an entry under its old key (spec invariant 2: "a user's nickname as key in the address book
/// is always the current (post-rename) nickname").
#[derive(Clone, Debug, Default)]
pub struct AddressBook {
    users: HashMap<String, User>,
    channels: HashMap<String, Channel>,
}

impl AddressBook {
    /// Creates an empty address book.
    pub fn new() -> AddressBook {
        AddressBook::default()
    }

    /// Merge-upserts `incoming` into the address book, keyed by its (folded) nickname, and
    /// returns the resulting canonical entry.
    pub fn update(&mut self, incoming: User, casemap: CaseMapping) -> &User {
        let key = casemap.fold(&incoming.nickname);
        self.users
            .entry(key.clone())
            .and_modify(|known| known.merge_from(&incoming))
            .or_insert(incoming);
        self.users.get(&key).expect("just inserted")
    }

    /// Looks up a user by nickname.
    pub fn get(&self, nickname: &str, casemap: CaseMapping) -> Option<&User> {
        self.users.get(&casemap.fold(nickname))
    }

    /// Looks up a user by nickname, mutably.
    pub fn get_mut(&mut self, nickname: &str, casemap: CaseMapping) -> Option<&mut User> {
        self.users.get_mut(&casemap.fold(nickname))
    }

    /// Renames a user in the address book and in every channel's membership set, preserving all
    /// other fields (spec §4.7 `rename`).
    pub fn rename(&mut self, old_nick: &str, new_nick: &str, casemap: CaseMapping) {
        let old_key = casemap.fold(old_nick);
        let new_key = casemap.fold(new_nick);
        if let Some(mut user) = self.users.remove(&old_key) {
            user.nickname = new_nick.to_owned();
            self.users.insert(new_key.clone(), user);
        }
        for channel in self.channels.values_mut() {
            channel.rename_member(&old_key, &new_key);
        }
    }

    /// Removes a user entirely (spec §4.7 `invalidate`), e.g. on QUIT.
    pub fn invalidate(&mut self, nickname: &str, casemap: CaseMapping) -> Option<User> {
        self.users.remove(&casemap.fold(nickname))
    }

    /// Removes `nickname` from every channel's membership (e.g. on QUIT), returning the names of
    /// channels it was a member of.
    pub fn remove_from_all_channels(&mut self, nickname: &str, casemap: CaseMapping) -> Vec<String> {
        let key = casemap.fold(nickname);
        let mut left = Vec::new();
        for channel in self.channels.values_mut() {
            if channel.remove_member(&key).is_some() {
                left.push(channel.name.clone());
            }
        }
        left
    }

    /// Gets or creates a channel record (join-confirmation).
    pub fn upsert_channel(&mut self, name: &str, casemap: CaseMapping) -> &mut Channel {
        self.channels.entry(casemap.fold(name)).or_insert_with(|| Channel::new(name))
    }

    /// Looks up a channel's membership record.
    pub fn channel(&self, name: &str, casemap: CaseMapping) -> Option<&Channel> {
        self.channels.get(&casemap.fold(name))
    }

    /// Looks up a channel's membership record mutably.
    pub fn channel_mut(&mut self, name: &str, casemap: CaseMapping) -> Option<&mut Channel> {
        self.channels.get_mut(&casemap.fold(name))
    }

    /// Removes a channel entirely (the self-user parted or was kicked from it; spec invariant 1).
    pub fn remove_channel(&mut self, name: &str, casemap: CaseMapping) -> Option<Channel> {
        self.channels.remove(&casemap.fold(name))
    }

    /// Iterates every currently-joined channel.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rename_rekeys_user_and_channel_membership() {
        let mut book = AddressBook::new();
        book.update(User::from_mask("old", "u", "h"), CaseMapping::Ascii);
        book.upsert_channel("#rust", CaseMapping::Ascii).upsert_member("old", "");

        book.rename("old", "new", CaseMapping::Ascii);

        assert!(book.get("old", CaseMapping::Ascii).is_none());
        assert_eq!(book.get("new", CaseMapping::Ascii).unwrap().nickname, "new");
        assert!(book.channel("#rust", CaseMapping::Ascii).unwrap().has_member("new"));
        assert!(!book.channel("#rust", CaseMapping::Ascii).unwrap().has_member("old"));
    }

    #[test]
    fn invalidate_removes_user_but_not_channel() {
        let mut book = AddressBook::new();
        book.update(User::new("someone"), CaseMapping::Ascii);
        book.invalidate("someone", CaseMapping::Ascii);
        assert!(book.get("someone", CaseMapping::Ascii).is_none());
    }

    #[test]
    fn quit_removes_from_every_channel() {
        let mut book = AddressBook::new();
        book.upsert_channel("#a", CaseMapping::Ascii).upsert_member("someone", "");
        book.upsert_channel("#b", CaseMapping::Ascii).upsert_member("someone", "@");
        let left = book.remove_from_all_channels("someone", CaseMapping::Ascii);
        assert_eq!(left.len(), 2);
    }

    #[test]
    fn merge_upsert_is_case_insensitive() {
        let mut book = AddressBook::new();
        book.update(User::from_mask("Someone", "u", "h"), CaseMapping::Ascii);
        book.update(User::new("SOMEONE"), CaseMapping::Ascii);
        assert_eq!(book.get("someone", CaseMapping::Ascii).unwrap().username.as_deref(), Some("u"));
    }
}
