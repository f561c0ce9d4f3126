//! A module providing an enum for a message prefix.
use std::fmt;
use std::str::FromStr;

/// The Prefix indicates "the true origin of the message", according to the server.
///
/// Warning: avoid constructing a `Nickname(nickname, None, Some(hostname))`, but
/// `Nickname(nickname, Some("".to_owned()), Some(hostname))` works reliably.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// servername
    ServerName(String),
    /// nickname \[ \["!" username\] "@" hostname \]
    Nickname(String, String, String),
}

impl Prefix {
    /// Creates a prefix by parsing a string.
    ///
    /// # Example
    /// ```
    /// use relaychat_proto::Prefix;
    /// Prefix::new_from_str("nickname!username@hostname");
    /// Prefix::new_from_str("example.com");
    /// ```
    pub fn new_from_str(s: &str) -> Prefix {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Active {
            Name,
            User,
            Host,
        }

        let mut name = String::new();
        let mut user = String::new();
        let mut host = String::new();
        let mut active = Active::Name;

        for c in s.chars() {
            match c {
                // We consider the '.' to be a ServerName except if a ! has already
                // been encountered.
                '.' if active == Active::Name => return Prefix::ServerName(s.to_owned()),

                '!' if active == Active::Name => {
                    active = Active::User;
                }

                // The '@' is not special until we've started the username portion.
                '@' if active == Active::User => {
                    active = Active::Host;
                }

                _ => match active {
                    Active::Name => name.push(c),
                    Active::User => user.push(c),
                    Active::Host => host.push(c),
                },
            }
        }

        Prefix::Nickname(name, user, host)
    }

    /// Returns the nickname part of this prefix, if it has one.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(name, ..) => Some(name),
            Prefix::ServerName(_) => None,
        }
    }
}

/// This implementation never returns an error and is isomorphic with `Display`.
impl FromStr for Prefix {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::new_from_str(s))
    }
}

/// This is isomorphic with `FromStr`.
impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => write!(f, "{}", name),
            Prefix::Nickname(name, user, host) => match (&name[..], &user[..], &host[..]) {
                ("", "", "") => write!(f, ""),
                (name, "", "") => write!(f, "{}", name),
                (name, user, "") => write!(f, "{}!{}", name, user),
                // user!@host is not a legal mask, so drop the host rather than emit it.
                (name, "", _host) => write!(f, "{}", name),
                (name, user, host) => write!(f, "{}!{}@{}", name, user, host),
            },
        }
    }
}

impl<'a> From<&'a str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::new_from_str(s)
    }
}

#[cfg(test)]
mod test {
    use super::Prefix::{self, Nickname, ServerName};

    // Checks that str -> parsed -> Display doesn't lose data.
    fn test_parse(s: &str) -> Prefix {
        let prefix = Prefix::new_from_str(s);
        let s2 = format!("{}", prefix);
        assert_eq!(s, &s2);
        prefix
    }

    #[test]
    fn print() {
        let s = format!("{}", Nickname("nick".into(), "".into(), "".into()));
        assert_eq!(&s, "nick");
        let s = format!("{}", Nickname("nick".into(), "user".into(), "".into()));
        assert_eq!(&s, "nick!user");
        let s = format!("{}", Nickname("nick".into(), "user".into(), "host".into()));
        assert_eq!(&s, "nick!user@host");
    }

    #[test]
    fn parse_word() {
        assert_eq!(
            test_parse("only_nick"),
            Nickname("only_nick".into(), String::new(), String::new())
        )
    }

    #[test]
    fn parse_host() {
        assert_eq!(test_parse("host.tld"), ServerName("host.tld".into()))
    }

    #[test]
    fn parse_nick_user_host() {
        assert_eq!(
            test_parse("test!nick@host"),
            Nickname("test".into(), "nick".into(), "host".into())
        );
    }

    #[test]
    fn nickname_accessor() {
        let p = Prefix::new_from_str("nick!user@host");
        assert_eq!(p.nickname(), Some("nick"));
        assert_eq!(Prefix::new_from_str("irc.example.com").nickname(), None);
    }
}
