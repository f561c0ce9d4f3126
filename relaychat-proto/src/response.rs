//! Enumeration of all server numeric replies this engine's dispatcher recognizes.
#![allow(non_camel_case_types)]

macro_rules! make_response {
    ($($(#[$attr:meta])+ $variant:ident = $value:expr),+ $(,)?) => {
        /// Every numeric reply this engine's dispatcher matches on, generated from this
        /// declarative table rather than hand-written per numeric (see Design Notes on
        /// generating numeric leaf parsers from a schema). Turning a numeric's positional
        /// arguments into a typed value is left to the small leaf functions next to each
        /// dispatcher handler; this enum only identifies *which* numeric a line is.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Response {
            $($(#[$attr])+ $variant = $value),+
        }

        impl Response {
            /// Builds a `Response` from a numeric code, if recognized.
            pub fn from_u16(val: u16) -> Option<Response> {
                match val {
                    $($value => Some(Response::$variant),)+
                    _ => None,
                }
            }

            /// Parses a three-digit numeric string (as found in `ParsedMessage::verb`) into a
            /// `Response`, if recognized.
            pub fn from_verb(verb: &str) -> Option<Response> {
                verb.parse::<u16>().ok().and_then(Response::from_u16)
            }

            /// The raw numeric code.
            pub fn code(self) -> u16 {
                self as u16
            }
        }
    }
}

make_response! {
    /// `001 Welcome to the Internet Relay Network <nick>!<user>@<host>`
    RPL_WELCOME = 1,
    /// `002 Your host is <servername>, running version <ver>`
    RPL_YOURHOST = 2,
    /// `003 This server was created <date>`
    RPL_CREATED = 3,
    /// `004 <servername> <version> <umodes> <chanmodes>`
    RPL_MYINFO = 4,
    /// `005 <servername> *(<feature>(=<value>)) :are supported by this server`
    RPL_ISUPPORT = 5,
    /// `251 :There are <n> users and <n> invisible on <n> servers`
    RPL_LUSERCLIENT = 251,
    /// `252 <n> :operator(s) online`
    RPL_LUSEROP = 252,
    /// `253 <n> :unknown connection(s)`
    RPL_LUSERUNKNOWN = 253,
    /// `254 <n> :channels formed`
    RPL_LUSERCHANNELS = 254,
    /// `255 :I have <n> clients and <n> servers`
    RPL_LUSERME = 255,
    /// `301 <nick> :<away message>`
    RPL_AWAY = 301,
    /// `303 :*1<nick> *( " " <nick> )`
    RPL_ISON = 303,
    /// `305 :You are no longer marked as being away`
    RPL_UNAWAY = 305,
    /// `306 :You have been marked as being away`
    RPL_NOWAWAY = 306,
    /// `307 <nick> :is a registered nick` (not in RFC2812; widely deployed)
    RPL_WHOISREGNICK = 307,
    /// `311 <nick> <user> <host> * :<real name>`
    RPL_WHOISUSER = 311,
    /// `312 <nick> <server> :<server info>`
    RPL_WHOISSERVER = 312,
    /// `313 <nick> :is an IRC operator`
    RPL_WHOISOPERATOR = 313,
    /// `315 <name> :End of WHO list`
    RPL_ENDOFWHO = 315,
    /// `317 <nick> <integer> <integer> :seconds idle, signon time`
    RPL_WHOISIDLE = 317,
    /// `318 <nick> :End of WHOIS list`
    RPL_ENDOFWHOIS = 318,
    /// `319 <nick> :*( ( "@" / "+" ) <channel> " " )`
    RPL_WHOISCHANNELS = 319,
    /// `321 Channel :Users Name`
    RPL_LISTSTART = 321,
    /// `322 <channel> <# visible> :<topic>`
    RPL_LIST = 322,
    /// `323 :End of /LIST`
    RPL_LISTEND = 323,
    /// `330 <nick> <account> :is logged in as`
    RPL_WHOISACCOUNT = 330,
    /// `332 <channel> :<topic>`
    RPL_TOPIC = 332,
    /// `333 <channel> <nick> <setat>`
    RPL_TOPICWHOTIME = 333,
    /// `351 <version>.<debuglevel> <server> :<comments>`
    RPL_VERSION = 351,
    /// `352 <channel> <user> <host> <server> <nick> <H|G>[*][@|+] :<hopcount> <real name>`
    RPL_WHOREPLY = 352,
    /// `353 ( "=" / "*" / "@" ) <channel> :[ "@" / "+" ] <nick> *( " " [ "@" / "+" ] <nick> )`
    RPL_NAMREPLY = 353,
    /// `354 <custom WHOX reply, fields per the requested %mask>`
    RPL_WHOXREPLY = 354,
    /// `366 <channel> :End of /NAMES list`
    RPL_ENDOFNAMES = 366,
    /// `372 :- <text>`
    RPL_MOTD = 372,
    /// `375 :- <server> Message of the day -`
    RPL_MOTDSTART = 375,
    /// `376 :End of /MOTD command`
    RPL_ENDOFMOTD = 376,
    /// `378 <nick> :is connecting from <host>`
    RPL_WHOISHOST = 378,
    /// `381 :You are now an IRC operator`
    RPL_YOUREOPER = 381,
    /// `382 <config file> :Rehashing`
    RPL_REHASHING = 382,
    /// `671 <nick> :is using a secure connection`
    RPL_WHOISSECURE = 671,
    /// `730 <nick> :target[,target2]*`
    RPL_MONONLINE = 730,
    /// `731 <nick> :target[,target2]*`
    RPL_MONOFFLINE = 731,
    /// `732 <nick> :target[,target2]*`
    RPL_MONLIST = 732,
    /// `733 <nick> :End of MONITOR list`
    RPL_ENDOFMONLIST = 733,
    /// `760 <target> <key> :<value>` (METADATA, set form, always has a value)
    RPL_WHOISKEYVALUE = 760,
    /// `761 <target> <key> <visibility> :<value>` (METADATA, `value` may be absent)
    RPL_KEYVALUE = 761,
    /// `762 :end of metadata`
    RPL_METADATAEND = 762,
    /// `770 <key>[ <key2> ...] :subscribed`
    RPL_METADATASUBOK = 770,
    /// `771 <key>[ <key2> ...] :unsubscribed`
    RPL_METADATAUNSUBOK = 771,
    /// `772 <key>[ <key2> ...] :currently subscribed`
    RPL_METADATASUBS = 772,
    /// `600 <nick> <user> <host> <added at> :logged online` (WATCH)
    RPL_LOGON = 600,
    /// `900 <nick> <nick>!<ident>@<host> <account> :You are now logged in as <user>`
    RPL_LOGGEDIN = 900,
    /// `901 <nick> <nick>!<ident>@<host> :You are now logged out`
    RPL_LOGGEDOUT = 901,
    /// `903 :SASL authentication successful`
    RPL_SASLSUCCESS = 903,
    /// `400 <command> :Unknown error`
    ERR_UNKNOWNERROR = 400,
    /// `402 <server name> :No such server`
    ERR_NOSUCHSERVER = 402,
    /// `422 :MOTD File is missing`
    ERR_NOMOTD = 422,
    /// `421 <command> :Unknown command`
    ERR_UNKNOWNCOMMAND = 421,
    /// `433 <nick> :Nickname is already in use`
    ERR_NICKNAMEINUSE = 433,
    /// `461 <command> :Not enough parameters`
    ERR_NEEDMOREPARAMS = 461,
    /// `481 :Permission Denied- You're not an IRC operator`
    ERR_NOPRIVILEGES = 481,
    /// `723 <command(s)> :Insufficient oper privileges.`
    ERR_NOPRIVS = 723,
    /// `734 <target> <limit> :Monitor list is full.`
    ERR_MONLISTFULL = 734,
    /// `764 <target> :metadata limit reached`
    ERR_METADATALIMIT = 764,
    /// `766 <target> <key> :key not set`
    ERR_KEYNOTSET = 766,
    /// `774 <target> [RETRY_AFTER] :You must wait longer before trying again`
    ERR_METADATASYNCLATER = 774,
    /// `902 :You must use a nick assigned to you`
    ERR_NICKLOCKED = 902,
    /// `904 :SASL authentication failed`
    ERR_SASLFAIL = 904,
    /// `905 :SASL message too long`
    ERR_SASLTOOLONG = 905,
    /// `906 :SASL authentication aborted`
    ERR_SASLABORTED = 906,
}

impl Response {
    /// Returns true if this numeric is conventionally an error (4xx/5xx/7xx error band).
    pub fn is_error(self) -> bool {
        let code = self.code();
        (400..600).contains(&code) || matches!(self, Response::ERR_NOPRIVS | Response::ERR_MONLISTFULL)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_known_numeric() {
        assert_eq!(Response::from_verb("001"), Some(Response::RPL_WELCOME));
        assert_eq!(Response::from_verb("318"), Some(Response::RPL_ENDOFWHOIS));
    }

    #[test]
    fn rejects_unknown_numeric() {
        assert_eq!(Response::from_verb("999"), None);
    }

    #[test]
    fn rejects_non_numeric_verb() {
        assert_eq!(Response::from_verb("PRIVMSG"), None);
    }

    #[test]
    fn error_band_classification() {
        assert!(Response::ERR_NOMOTD.is_error());
        assert!(!Response::RPL_WELCOME.is_error());
    }
}
