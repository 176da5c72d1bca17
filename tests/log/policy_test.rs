//! Tests for `src/log/policy.rs`: logging policy evaluation.

use std::path::PathBuf;
use std::sync::Arc;

use owlcore::config::{DirectionRestriction, LoggingConfig, PolicyMode};
use owlcore::log::policy::native_should_log;
use owlcore::log::{ExtensionHost, HostPolicy, LogRules, LoggingPolicy, NativePolicy};
use owlcore::message::{Direction, LoginEvent, MessageEntity, Protocol};

fn rules(config: LoggingConfig) -> LogRules {
    LogRules::new(config).expect("config should be valid")
}

fn all_on() -> LoggingConfig {
    LoggingConfig {
        logging: true,
        class_logging: true,
        log_logins: true,
        log_path: "/logs/people".to_owned(),
        class_log_path: "/logs/class".to_owned(),
        ..LoggingConfig::default()
    }
}

fn zephyr_personal(direction: Direction) -> MessageEntity {
    MessageEntity::new(1, direction, Protocol::Zephyr)
        .with_sender("alice")
        .with_recipient("me")
        .with_class("message", "personal")
        .with_body("hi")
        .personal()
}

fn zephyr_class() -> MessageEntity {
    MessageEntity::new(2, Direction::In, Protocol::Zephyr)
        .with_sender("bob")
        .with_class("help", "linux")
        .with_body("question")
}

#[test]
fn login_suppressed_when_login_logging_off() {
    let config = LoggingConfig {
        log_logins: false,
        ..all_on()
    };
    let login = MessageEntity::new(3, Direction::In, Protocol::Aim)
        .with_sender("carol")
        .with_login(LoginEvent::Login)
        .private();
    assert!(!native_should_log(&login, &rules(config)));
    assert!(native_should_log(&login, &rules(all_on())));
}

#[test]
fn matching_filter_overrides_class_logging() {
    let config = LoggingConfig {
        class_logging: false,
        log_filter: Some("class ^help$".to_owned()),
        ..LoggingConfig::default()
    };
    assert!(native_should_log(&zephyr_class(), &rules(config.clone())));

    let other = MessageEntity::new(4, Direction::In, Protocol::Zephyr).with_class("misc", "x");
    assert!(!native_should_log(&other, &rules(config)));
}

#[test]
fn filter_overrides_login_suppression() {
    let config = LoggingConfig {
        log_logins: false,
        log_filter: Some("login .".to_owned()),
        ..LoggingConfig::default()
    };
    let logout = MessageEntity::new(5, Direction::In, Protocol::Zephyr)
        .with_login(LoginEvent::Logout);
    assert!(native_should_log(&logout, &rules(config)));
}

#[test]
fn direction_restriction_applies() {
    let inbound_only = LoggingConfig {
        direction: DirectionRestriction::In,
        ..all_on()
    };
    let outbound_only = LoggingConfig {
        direction: DirectionRestriction::Out,
        ..all_on()
    };
    let incoming = zephyr_personal(Direction::In);
    let outgoing = zephyr_personal(Direction::Out);

    assert!(native_should_log(&incoming, &rules(inbound_only.clone())));
    assert!(!native_should_log(&outgoing, &rules(inbound_only)));
    assert!(!native_should_log(&incoming, &rules(outbound_only.clone())));
    assert!(native_should_log(&outgoing, &rules(outbound_only)));
}

#[test]
fn zephyr_personal_and_class_switches_are_independent() {
    let personal_only = LoggingConfig {
        logging: true,
        class_logging: false,
        ..LoggingConfig::default()
    };
    let class_only = LoggingConfig {
        logging: false,
        class_logging: true,
        ..LoggingConfig::default()
    };
    let personal = zephyr_personal(Direction::In);

    assert!(native_should_log(&personal, &rules(personal_only.clone())));
    assert!(!native_should_log(&zephyr_class(), &rules(personal_only)));
    assert!(!native_should_log(&personal, &rules(class_only.clone())));
    assert!(native_should_log(&zephyr_class(), &rules(class_only)));
}

#[test]
fn other_protocols_split_on_private() {
    let personal_only = LoggingConfig {
        logging: true,
        class_logging: false,
        ..LoggingConfig::default()
    };
    let im = MessageEntity::new(6, Direction::In, Protocol::Jabber)
        .with_sender("dave")
        .private();
    let channel = MessageEntity::new(7, Direction::In, Protocol::Irc)
        .with_sender("eve")
        .with_recipient("#rust");

    assert!(native_should_log(&im, &rules(personal_only.clone())));
    assert!(!native_should_log(&channel, &rules(personal_only)));
}

#[test]
fn native_filenames_for_personal_and_class() {
    let config = LoggingConfig {
        local_realm: Some("EXAMPLE.COM".to_owned()),
        ..all_on()
    };
    let rules = rules(config);
    let personal = MessageEntity::new(1, Direction::In, Protocol::Zephyr)
        .with_sender("alice@EXAMPLE.COM")
        .personal();

    assert_eq!(
        NativePolicy.filenames(&personal, &rules),
        vec![
            PathBuf::from("/logs/people/alice"),
            PathBuf::from("/logs/people/all")
        ]
    );
    assert_eq!(
        NativePolicy.filenames(&zephyr_class(), &rules),
        vec![PathBuf::from("/logs/class/help")]
    );

    let outgoing_im = MessageEntity::new(2, Direction::Out, Protocol::Aim)
        .with_sender("me")
        .with_recipient("frank")
        .private();
    assert_eq!(
        NativePolicy.filenames(&outgoing_im, &rules)[0],
        PathBuf::from("/logs/people/frank")
    );
}

#[test]
fn native_render_includes_headers_and_body() {
    let rules = rules(all_on());
    let text = NativePolicy.render(&zephyr_class(), &rules);
    assert!(text.starts_with("Class: help Instance: linux\n"));
    assert!(text.contains("From: bob <>"));
    assert!(text.ends_with("question\n\n"));

    let login = MessageEntity::new(9, Direction::In, Protocol::Aim)
        .with_sender("carol")
        .with_login(LoginEvent::Login);
    assert!(NativePolicy.render(&login, &rules).starts_with("carol logged in at "));
}

struct ScriptedHost {
    decision: Option<bool>,
    filenames: &'static str,
}

impl ExtensionHost for ScriptedHost {
    fn should_log(&self, _msg: &MessageEntity) -> Option<bool> {
        self.decision
    }

    fn log_filenames(&self, _msg: &MessageEntity) -> String {
        self.filenames.to_owned()
    }

    fn render_log(&self, msg: &MessageEntity) -> String {
        format!("host:{}\n", msg.body())
    }
}

#[test]
fn host_policy_delegates_and_overrides() {
    let off = rules(LoggingConfig::default());
    let msg = zephyr_class();

    let yes = HostPolicy::new(Arc::new(ScriptedHost {
        decision: Some(true),
        filenames: "/a\n/b\n",
    }));
    assert!(yes.should_log(&msg, &off));
    assert_eq!(
        yes.filenames(&msg, &off),
        vec![PathBuf::from("/a"), PathBuf::from("/b")]
    );
    assert_eq!(yes.render(&msg, &off), "host:question\n");

    let deferring = HostPolicy::new(Arc::new(ScriptedHost {
        decision: None,
        filenames: "",
    }));
    assert!(!deferring.should_log(&msg, &off));
    assert!(deferring.should_log(&msg, &rules(all_on())));
    assert!(deferring.filenames(&msg, &off).is_empty());
}

#[test]
fn host_filenames_expand_home() {
    let policy = HostPolicy::new(Arc::new(ScriptedHost {
        decision: None,
        filenames: "~/zlog/people/alice",
    }));
    let files = policy.filenames(&zephyr_class(), &rules(all_on()));
    assert_eq!(files.len(), 1);
    assert!(!files[0].starts_with("~"));
    assert!(files[0].ends_with("zlog/people/alice"));
}

#[test]
fn select_policy_honours_mode() {
    let host: Arc<dyn ExtensionHost> = Arc::new(ScriptedHost {
        decision: Some(false),
        filenames: "/x",
    });
    let rules = rules(all_on());
    let msg = zephyr_class();

    let hosted = owlcore::log::select_policy(PolicyMode::Host, Some(Arc::clone(&host)));
    assert!(!hosted.should_log(&msg, &rules));

    let native = owlcore::log::select_policy(PolicyMode::Native, Some(host));
    assert!(native.should_log(&msg, &rules));

    let fallback = owlcore::log::select_policy(PolicyMode::Host, None);
    assert!(fallback.should_log(&msg, &rules));
}
