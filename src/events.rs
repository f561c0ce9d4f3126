//! The public event surface (spec §4.12): register-once callback slots, each a pure
//! notification over borrowed, immutable payloads. An unset callback is simply never invoked —
//! no panic, no error — matching this engine's "errors are data" policy: a missing handler isn't
//! an error condition at all.
use crate::dispatcher::MessageMetadata;
use crate::error::EngineError;
use crate::user::User;
use crate::whois::WhoisResponse;
use relaychat_proto::mode::ModeChange;

/// Whether a message-style event came from `PRIVMSG` or `NOTICE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// `PRIVMSG`.
    Privmsg,
    /// `NOTICE`.
    Notice,
}

/// Which `251`-`255` LUSERS line fired this event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LuserKind {
    /// `251 RPL_LUSERCLIENT`.
    Client,
    /// `252 RPL_LUSEROP`.
    Op,
    /// `253 RPL_LUSERUNKNOWN`.
    Unknown,
    /// `254 RPL_LUSERCHANNELS`.
    Channels,
    /// `255 RPL_LUSERME`.
    Me,
}

/// Declares one `Events<'a>` field per row, plus its public `register_on_*` setter and its
/// crate-internal emitter of the same base name.
macro_rules! define_event_slots {
    ($( $(#[$doc:meta])* $name:ident => $setter:ident ( $($arg:ident : $ty:ty),* $(,)? ); )+) => {
        /// The callback registry an `Engine` dispatches to. Each slot takes borrowed,
        /// call-scoped payloads that do not outlive the `push` call that produced them.
        #[derive(Default)]
        pub struct Events<'a> {
            $( $name: Option<Box<dyn FnMut($($ty),*) + 'a>>, )+
        }

        impl<'a> Events<'a> {
            /// Creates an `Events` registry with every slot unset.
            pub fn new() -> Events<'a> {
                Events::default()
            }

            $(
                $(#[$doc])*
                pub fn $setter(&mut self, f: impl FnMut($($ty),*) + 'a) {
                    self.$name = Some(Box::new(f));
                }

                pub(crate) fn $name(&mut self, $($arg: $ty),*) {
                    if let Some(callback) = self.$name.as_mut() {
                        callback($($arg),*);
                    }
                }
            )+
        }
    }
}

define_event_slots! {
    /// Fires exactly once, after registration completes (testable property 6).
    on_connect => register_on_connect();
    /// Fires for every line, before `onRaw` and verb-specific dispatch, carrying the line's
    /// computed batch membership, tags, and timestamp.
    on_message_metadata => register_on_message_metadata(metadata: &MessageMetadata);
    /// Fires for every line, before verb-specific dispatch.
    on_raw => register_on_raw(raw: &str);
    /// `PRIVMSG`/`NOTICE`.
    on_message => register_on_message(kind: MessageKind, source: &User, target: &str, text: &str, is_echo: bool);
    /// A user (possibly self) joined a channel.
    on_join => register_on_join(channel: &str, user: &User);
    /// A user left a channel via `PART`.
    on_part => register_on_part(channel: &str, user: &User, reason: Option<&str>);
    /// A user was removed from a channel via `KICK`.
    on_kick => register_on_kick(channel: &str, by: &User, target_nick: &str, reason: Option<&str>);
    /// A user disconnected.
    on_quit => register_on_quit(user: &User, reason: Option<&str>);
    /// A user changed nickname.
    on_nick => register_on_nick(old_nick: &str, new_nick: &str);
    /// One parsed `MODE` change.
    on_mode => register_on_mode(target: &str, change: &ModeChange, by: Option<&User>);
    /// `TOPIC` changed live (not the registration-time `332`/`333` replies).
    on_topic_change => register_on_topic_change(channel: &str, topic: Option<&str>, by: Option<&User>);
    /// `INVITE`.
    on_invite => register_on_invite(channel: &str, by: &User, invited_nick: &str);
    /// One completed WHOIS accumulation (testable property 5).
    on_whois => register_on_whois(response: &WhoisResponse);
    /// `322 RPL_LIST`, one row.
    on_list => register_on_list(channel: &str, visible_count: u32, topic: &str);
    /// `323 RPL_LISTEND`.
    on_channel_list_update => register_on_channel_list_update();
    /// `353 RPL_NAMREPLY`, accumulated member list for one channel.
    on_names_reply => register_on_names_reply(channel: &str, names: &[String]);
    /// `333 RPL_TOPICWHOTIME`.
    on_topic_who_time_reply => register_on_topic_who_time_reply(channel: &str, who: &str, set_at: &str);
    /// `332 RPL_TOPIC`.
    on_topic_reply => register_on_topic_reply(channel: &str, topic: &str);
    /// `351 RPL_VERSION`.
    on_version_reply => register_on_version_reply(version: &str, server: &str, comments: &str);
    /// `382 RPL_REHASHING`.
    on_server_rehashing => register_on_server_rehashing(config_file: &str);
    /// `381 RPL_YOUREOPER`.
    on_youre_oper => register_on_youre_oper();
    /// Any `kind`-classified error condition (spec §7).
    on_error => register_on_error(error: &EngineError);
    /// `CAP * LS`, once fully assembled.
    on_receive_cap_ls => register_on_receive_cap_ls(caps: &[String]);
    /// `CAP * LIST`.
    on_receive_cap_list => register_on_receive_cap_list(caps: &[String]);
    /// `CAP * ACK`.
    on_receive_cap_ack => register_on_receive_cap_ack(caps: &[String]);
    /// `CAP * NAK`.
    on_receive_cap_nak => register_on_receive_cap_nak(caps: &[String]);
    /// `CAP * NEW`.
    on_receive_cap_new => register_on_receive_cap_new(caps: &[String]);
    /// `CAP * DEL`.
    on_receive_cap_del => register_on_receive_cap_del(caps: &[String]);
    /// `730 RPL_MONONLINE`, one nick.
    on_user_online => register_on_user_online(nick: &str);
    /// `731 RPL_MONOFFLINE`, one nick.
    on_user_offline => register_on_user_offline(nick: &str);
    /// `732 RPL_MONLIST`.
    on_monitor_list => register_on_monitor_list(nicks: &[String]);
    /// `CHGHOST`.
    on_chg_host => register_on_chg_host(nick: &str, new_username: &str, new_hostname: &str);
    /// `354 RPL_WHOXREPLY`, raw selected fields in requested order.
    on_whox_reply => register_on_whox_reply(fields: &[String]);
    /// `306 RPL_NOWAWAY`: self is now away.
    on_away_reply => register_on_away_reply(message: &str);
    /// `305 RPL_UNAWAY`: self is no longer away.
    on_unaway_reply => register_on_unaway_reply();
    /// `301 RPL_AWAY`: another user is away.
    on_other_user_away_reply => register_on_other_user_away_reply(nick: &str, message: &str);
    /// Fires alongside `on_unaway_reply`, naming the "no longer away" transition explicitly for
    /// embedders that model away/back as distinct states.
    on_back => register_on_back();
    /// `303 RPL_ISON`, one online nick.
    on_is_on => register_on_is_on(nick: &str);
    /// `772 RPL_METADATASUBS`.
    on_metadata_sub_list => register_on_metadata_sub_list(keys: &[String]);
    /// `900 RPL_LOGGEDIN`.
    on_login => register_on_login(nick: &str, account: &str);
    /// `901 RPL_LOGGEDOUT`.
    on_logout => register_on_logout(nick: &str);
    /// `WALLOPS`.
    on_wallops => register_on_wallops(text: &str, by: Option<&User>);
    /// `251`-`255` LUSERS replies.
    on_luser => register_on_luser(kind: LuserKind, text: &str);
    /// Debug hook: fires with the exact bytes written for every outgoing line.
    on_send => register_on_send(raw: &str);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unset_callback_is_a_no_op() {
        let mut events = Events::new();
        events.on_connect();
    }

    #[test]
    fn registered_callback_fires() {
        let mut fired = false;
        {
            let mut events = Events::new();
            events.register_on_connect(|| fired = true);
            events.on_connect();
        }
        assert!(fired);
    }

    #[test]
    fn callback_receives_payload() {
        let mut seen = String::new();
        {
            let mut events = Events::new();
            events.register_on_raw(|raw: &str| seen = raw.to_owned());
            events.on_raw("PING :x");
        }
        assert_eq!(seen, "PING :x");
    }
}
