//! IRCv3 capability names and the capability this engine negotiates.

/// The exact set of IRCv3 capabilities this engine knows how to negotiate and act on. Anything
/// advertised by a server outside this list is simply never `REQ`'d.
pub const SUPPORTED_CAPABILITIES: &[&str] = &[
    "account-notify",
    "account-tag",
    "away-notify",
    "batch",
    "cap-notify",
    "chghost",
    "echo-message",
    "extended-join",
    "invite-notify",
    "draft/metadata-2",
    "message-tags",
    "draft/metadata-notify-2",
    "draft/multiline",
    "multi-prefix",
    "sasl",
    "server-time",
    "userhost-in-names",
];

/// Returns true if `name` is in [`SUPPORTED_CAPABILITIES`].
pub fn is_supported(name: &str) -> bool {
    SUPPORTED_CAPABILITIES.contains(&name)
}

/// A capability name together with its (possibly structured) advertised value, as sent in a
/// `CAP * LS`/`CAP * NEW` reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capability {
    /// The capability's name, e.g. `"sasl"` or `"draft/metadata-2"`.
    pub name: String,
    /// The raw value string, if the server sent `name=value`. Comma- or key-value-delimited
    /// payloads (e.g. `sasl=PLAIN,EXTERNAL` or `draft/metadata-2=maxsub=50,maxkey=25`) are
    /// interpreted by the capability-specific code that consumes them, not here.
    pub value: Option<String>,
}

impl Capability {
    /// Parses one `name` or `name=value` token from a CAP line.
    pub fn parse(token: &str) -> Capability {
        match token.split_once('=') {
            Some((name, value)) => Capability { name: name.to_owned(), value: Some(value.to_owned()) },
            None => Capability { name: token.to_owned(), value: None },
        }
    }

    /// Splits this capability's value on commas, useful for `sasl=PLAIN,EXTERNAL`-shaped values.
    pub fn comma_values(&self) -> Vec<&str> {
        self.value.as_deref().map(|v| v.split(',').filter(|s| !s.is_empty()).collect()).unwrap_or_default()
    }

    /// Parses this capability's value as a comma-delimited `key=value` list, as used by
    /// `draft/metadata-2=maxsub=50,maxkey=25`.
    pub fn key_value_pairs(&self) -> Vec<(&str, &str)> {
        self.comma_values()
            .into_iter()
            .filter_map(|pair| pair.split_once('='))
            .collect()
    }
}

/// IRCv3 capability negotiation protocol versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationVersion {
    /// [IRCv3.1](http://ircv3.net/specs/core/capability-negotiation-3.1.html)
    V301,
    /// [IRCv3.2](http://ircv3.net/specs/core/capability-negotiation-3.2.html)
    V302,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_bare_and_valued_tokens() {
        assert_eq!(Capability::parse("multi-prefix"), Capability { name: "multi-prefix".into(), value: None });
        assert_eq!(
            Capability::parse("sasl=PLAIN,EXTERNAL"),
            Capability { name: "sasl".into(), value: Some("PLAIN,EXTERNAL".into()) }
        );
    }

    #[test]
    fn comma_values_split() {
        let cap = Capability::parse("sasl=PLAIN,EXTERNAL");
        assert_eq!(cap.comma_values(), vec!["PLAIN", "EXTERNAL"]);
    }

    #[test]
    fn key_value_pairs_split() {
        let cap = Capability::parse("draft/metadata-2=maxsub=50,maxkey=25");
        assert_eq!(cap.key_value_pairs(), vec![("maxsub", "50"), ("maxkey", "25")]);
    }

    #[test]
    fn supported_set_matches_spec() {
        assert!(is_supported("sasl"));
        assert!(is_supported("draft/metadata-2"));
        assert!(!is_supported("znc.in/playback"));
    }
}
