//! The self-declared identity an embedder hands the engine at construction time.

/// The nickname, username, realname, optional server password, and SASL mechanism preference
/// list an embedder supplies when constructing an `Engine` (spec's "self-declared identity").
///
/// This is a plain builder-style value, not a configuration *loader* — reading identity out of a
/// JSON/TOML file is explicitly an external collaborator's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// The nickname to request at registration.
    pub nickname: String,
    /// The `USER` username field.
    pub username: String,
    /// The `USER` realname field.
    pub realname: String,
    /// The `PASS` password, sent before `NICK`/`USER` if present.
    pub password: Option<String>,
    /// SASL mechanism names to offer, in preference order, used to pick the mechanism when the
    /// server advertises `sasl=...`.
    pub sasl_mechanisms: Vec<String>,
}

impl Identity {
    /// Creates an identity with no password and no SASL mechanisms.
    pub fn new(nickname: impl Into<String>, username: impl Into<String>, realname: impl Into<String>) -> Identity {
        Identity {
            nickname: nickname.into(),
            username: username.into(),
            realname: realname.into(),
            password: None,
            sasl_mechanisms: Vec::new(),
        }
    }

    /// Sets the server password.
    pub fn with_password(mut self, password: impl Into<String>) -> Identity {
        self.password = Some(password.into());
        self
    }

    /// Sets the SASL mechanism preference list.
    pub fn with_sasl_mechanisms(mut self, mechanisms: Vec<String>) -> Identity {
        self.sasl_mechanisms = mechanisms;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder_defaults() {
        let id = Identity::new("someone", "someone", "Someone");
        assert_eq!(id.password, None);
        assert!(id.sasl_mechanisms.is_empty());
    }

    #[test]
    fn builder_chains() {
        let id = Identity::new("a", "b", "c")
            .with_password("hunter2")
            .with_sasl_mechanisms(vec!["PLAIN".into()]);
        assert_eq!(id.password.as_deref(), Some("hunter2"));
        assert_eq!(id.sasl_mechanisms, vec!["PLAIN".to_owned()]);
    }
}
