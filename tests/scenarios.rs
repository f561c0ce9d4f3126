//! End-to-end integration tests for the scenarios named in this engine's own design notes
//! (registration handshake, batch nesting, parametric mode parsing, WHOIS aggregation, METADATA
//! subscription bookkeeping, and SASL PLAIN). Unit-level coverage for most of these already lives
//! alongside the modules they exercise; these drive the whole `Engine` end to end instead.
use std::cell::RefCell;
use std::rc::Rc;

use relaychat::proto::mode::Sign;
use relaychat::{Engine, Identity, Plain, SaslMechanism};

fn sent_lines(sink: Vec<u8>) -> Vec<String> {
    String::from_utf8(sink).unwrap().lines().map(String::from).collect()
}

#[test]
fn s1_basic_registration_and_welcome() {
    let mut sink: Vec<u8> = Vec::new();
    let identity = Identity::new("someone", "someone", "someone");
    let mut mechanisms: Vec<Box<dyn SaslMechanism>> = Vec::new();
    let connected = Rc::new(RefCell::new(false));

    {
        let mut engine = Engine::new(&mut sink, identity, &mut mechanisms);
        let connected = connected.clone();
        engine.events().register_on_connect(move || *connected.borrow_mut() = true);

        engine.push(":localhost CAP * LS :multi-prefix sasl");
        engine.push(":localhost CAP * ACK :multi-prefix");
        engine.push(":localhost 001 someone :Welcome");

        assert!(engine.is_registered());
    }

    assert!(*connected.borrow());
    assert_eq!(
        sent_lines(sink),
        vec![
            "CAP LS 302",
            "NICK someone",
            "USER someone 0 * :someone",
            "CAP REQ multi-prefix sasl",
            "CAP END",
        ]
    );
}

#[test]
fn s2_nested_batch_preservation() {
    let mut sink: Vec<u8> = Vec::new();
    let identity = Identity::new("someone", "someone", "someone");
    let mut mechanisms: Vec<Box<dyn SaslMechanism>> = Vec::new();
    let mut engine = Engine::new(&mut sink, identity, &mut mechanisms);

    let messages = Rc::new(RefCell::new(Vec::new()));
    {
        let messages = messages.clone();
        engine
            .events()
            .register_on_message(move |_kind, _source, target, text, _echo| messages.borrow_mut().push((target.to_owned(), text.to_owned())));
    }

    engine.push(":irc.host BATCH +outer example.com/foo");
    engine.push("@batch=outer :irc.host BATCH +inner example.com/bar");
    engine.push("@batch=inner :nick!u@h PRIVMSG #c :Hi");
    assert!(messages.borrow().is_empty(), "no events fire before the outer batch closes");

    engine.push("@batch=outer :irc.host BATCH -inner");
    assert!(messages.borrow().is_empty());

    engine.push(":irc.host BATCH -outer");

    let seen = messages.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], ("#c".to_owned(), "Hi".to_owned()));
}

#[test]
fn s3_mode_parsing_with_channel_categories() {
    let mut sink: Vec<u8> = Vec::new();
    let identity = Identity::new("someone", "someone", "someone");
    let mut mechanisms: Vec<Box<dyn SaslMechanism>> = Vec::new();
    let mut engine = Engine::new(&mut sink, identity, &mut mechanisms);

    let changes = Rc::new(RefCell::new(Vec::new()));
    {
        let changes = changes.clone();
        engine.events().register_on_mode(move |_target, change, _by| {
            changes.borrow_mut().push((change.mode.letter, change.sign, change.mode.arg.clone()))
        });
    }

    engine.push(":localhost 005 someone CHANMODES=b,k,l,imnpst :are supported by this server");
    engine.push(":someone MODE #test -sk+nl secret 4");

    let seen = changes.borrow();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], ('s', Sign::Unset, None));
    assert_eq!(seen[1], ('k', Sign::Unset, Some("secret".to_owned())));
    assert_eq!(seen[2], ('n', Sign::Set, None));
    assert_eq!(seen[3], ('l', Sign::Set, Some("4".to_owned())));
}

#[test]
fn s4_whois_aggregation() {
    let mut sink: Vec<u8> = Vec::new();
    let identity = Identity::new("someone", "someone", "someone");
    let mut mechanisms: Vec<Box<dyn SaslMechanism>> = Vec::new();
    let mut engine = Engine::new(&mut sink, identity, &mut mechanisms);

    let whois = Rc::new(RefCell::new(None));
    {
        let whois = whois.clone();
        engine.events().register_on_whois(move |response| *whois.borrow_mut() = Some(response.clone()));
    }

    engine.push(":localhost 311 someone someoneElse someUsername someHostname * :Some Real Name");
    engine.push(":localhost 312 someone someoneElse example.net :example server");
    engine.push(":localhost 313 someone someoneElse :is an IRC operator");
    engine.push(":localhost 317 someone someoneElse 1000 1500000000 :seconds idle, signon time");
    engine.push(":localhost 671 someone someoneElse :is using a secure connection");
    engine.push(":localhost 307 someone someoneElse :is a registered nick");
    engine.push(":localhost 330 someone someoneElse someoneElseAccount :is logged in as");
    engine.push(":localhost 319 someone someoneElse :+#test #test2");
    assert!(whois.borrow().is_none(), "no onWhois before end-of-WHOIS");

    engine.push(":localhost 318 someone someoneElse :End of /WHOIS list.");

    let response = whois.borrow().clone().expect("onWhois fired");
    assert!(response.is_oper);
    assert!(response.is_secure);
    assert!(response.is_registered);
    assert_eq!(response.account.as_deref(), Some("someoneElseAccount"));
    assert_eq!(response.idle_time, Some(1000));
    assert_eq!(response.connected_time, Some(1_500_000_000));
    assert_eq!(response.channels.get("#test").map(String::as_str), Some("+"));
    assert_eq!(response.channels.get("#test2").map(String::as_str), Some(""));
}

#[test]
fn s5_metadata_subscription_limit() {
    let mut sink: Vec<u8> = Vec::new();
    let identity = Identity::new("someone", "someone", "someone");
    let mut mechanisms: Vec<Box<dyn SaslMechanism>> = Vec::new();
    let mut engine = Engine::new(&mut sink, identity, &mut mechanisms);

    engine.push(":localhost CAP * LS :draft/metadata-2=maxsub=50,maxkey=25");
    engine.push(":localhost CAP * ACK :draft/metadata-2");

    engine.metadata_sub("*", &["avatar", "website", "foo", "bar", "baz"]).unwrap();
    engine.push(":localhost 770 someone avatar website foo bar baz :subscribed");
    assert_eq!(engine.metadata().subscriptions().len(), 5);
    assert_eq!(engine.metadata().max_subscriptions, Some(50));

    engine.metadata_unsub("*", &["foo", "bar"]).unwrap();
    engine.push(":localhost 771 someone bar foo :unsubscribed");
    assert_eq!(engine.metadata().subscriptions().len(), 3);
    assert!(!engine.metadata().subscriptions().contains("foo"));
}

#[test]
fn s6_sasl_plain() {
    let mut sink: Vec<u8> = Vec::new();
    let identity = Identity::new("jilles", "jilles", "jilles").with_sasl_mechanisms(vec!["PLAIN".into()]);
    let mut mechanisms: Vec<Box<dyn SaslMechanism>> = vec![Box::new(Plain::new("jilles", "jilles", "sesame"))];
    let mut engine = Engine::new(&mut sink, identity, &mut mechanisms);

    engine.push(":localhost CAP * LS :sasl=EXTERNAL,PLAIN");
    engine.push(":localhost CAP * ACK :sasl");
    engine.push("AUTHENTICATE +");
    engine.push(":localhost 903 jilles :SASL authentication successful");

    let sent = sent_lines(sink);
    assert!(sent.contains(&"AUTHENTICATE PLAIN".to_owned()));
    assert!(sent.contains(&"AUTHENTICATE amlsbGVzAGppbGxlcwBzZXNhbWU=".to_owned()));
}
