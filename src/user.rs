//! A single known user, as tracked by the address book (spec §3 `User`).

/// A user known to the engine: by mask, optionally by account, optionally by real name.
///
/// Created on first sighting (a JOIN, a message, a WHOIS reply, ...), mutated in place by
/// `CHGHOST`/`NICK`/`ACCOUNT`, and removed when the user quits or (for the self user) the session
/// ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// The current nickname.
    pub nickname: String,
    /// The ident/username part of the mask, if known.
    pub username: Option<String>,
    /// The hostname part of the mask, if known.
    pub hostname: Option<String>,
    /// The services account name, if known (`extended-join`, `account-notify`, `account-tag`,
    /// WHOIS `330`). `None` means unknown, not "known to have no account" — see
    /// [`User::clear_account`] for the explicit-logout case.
    pub account: Option<String>,
    /// The real name (`GECOS`), if known.
    pub realname: Option<String>,
}

impl User {
    /// Creates a user known only by nickname.
    pub fn new(nickname: impl Into<String>) -> User {
        User { nickname: nickname.into(), username: None, hostname: None, account: None, realname: None }
    }

    /// Creates a user from a full `nick!user@host` mask.
    pub fn from_mask(nickname: &str, username: &str, hostname: &str) -> User {
        User {
            nickname: nickname.to_owned(),
            username: if username.is_empty() { None } else { Some(username.to_owned()) },
            hostname: if hostname.is_empty() { None } else { Some(hostname.to_owned()) },
            account: None,
            realname: None,
        }
    }

    /// Merges `other` into `self`: fields known in `other` overwrite, fields unknown in `other`
    /// (`None`) leave `self`'s existing value untouched. This is the address book's
    /// merge-upsert rule (spec §4.7): "missing fields on incoming user do not overwrite known
    /// fields".
    pub fn merge_from(&mut self, other: &User) {
        self.nickname = other.nickname.clone();
        if other.username.is_some() {
            self.username = other.username.clone();
        }
        if other.hostname.is_some() {
            self.hostname = other.hostname.clone();
        }
        if other.account.is_some() {
            self.account = other.account.clone();
        }
        if other.realname.is_some() {
            self.realname = other.realname.clone();
        }
    }

    /// Sets the account, or clears it if `value` is `"*"` (the `ACCOUNT`/extended-join
    /// no-account sentinel).
    pub fn set_account(&mut self, value: &str) {
        self.account = if value == "*" { None } else { Some(value.to_owned()) };
    }

    /// Explicitly clears a known account (the `ACCOUNT *` logout sentinel). Unlike
    /// `merge_from`, which never overwrites a known field with "unknown", this forces the
    /// clear through.
    pub fn clear_account(&mut self) {
        self.account = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merge_upsert_preserves_unknown_fields() {
        let mut known = User::from_mask("nick", "user", "host");
        known.account = Some("acct".into());
        let incoming = User::new("nick");
        known.merge_from(&incoming);
        assert_eq!(known.username.as_deref(), Some("user"));
        assert_eq!(known.account.as_deref(), Some("acct"));
    }

    #[test]
    fn merge_upsert_overwrites_known_fields() {
        let mut known = User::from_mask("nick", "olduser", "oldhost");
        let incoming = User::from_mask("nick", "newuser", "newhost");
        known.merge_from(&incoming);
        assert_eq!(known.username.as_deref(), Some("newuser"));
        assert_eq!(known.hostname.as_deref(), Some("newhost"));
    }

    #[test]
    fn account_star_clears() {
        let mut u = User::new("nick");
        u.set_account("shelly");
        assert_eq!(u.account.as_deref(), Some("shelly"));
        u.set_account("*");
        assert_eq!(u.account, None);
    }
}
