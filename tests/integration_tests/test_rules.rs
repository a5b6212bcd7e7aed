// library-level tests: rules built from text and by hand, driven by motion

use chrono::{Duration, FixedOffset, TimeZone, Weekday};

use motion_wol::conditions::{load_rules, parse_time, Condition, Host, Node, When};
use motion_wol::engine::Engine;
use motion_wol::rules::{ConfigurationError, Rule, RuleArg, RuleRegistry};

use crate::common::SAMPLE_RULES;

fn at(day: u32, hour: u32, min: u32) -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, day, hour, min, 0)
        .unwrap()
}

#[test]
fn test_sample_rules_through_a_day() {
    let mut registry = RuleRegistry::new();
    assert_eq!(load_rules(SAMPLE_RULES, &mut registry).unwrap(), 2);
    let mut engine = Engine::new(registry);

    // Wednesday morning, first motion: the window rule fires on the weekday alone
    let wakes = engine.on_motion(&at(5, 9, 0));
    assert_eq!(wakes.len(), 1);
    assert_eq!(wakes[0].mac().to_string(), "00:11:12:13:14:15");

    // eleven quiet minutes later the office machine joins in
    let wakes = engine.on_motion(&at(5, 9, 11));
    let macs: Vec<String> = wakes.iter().map(|w| w.mac().to_string()).collect();
    assert_eq!(macs, vec!["00:24:1d:d9:fa:09", "00:11:12:13:14:15"]);

    // a minute later the room has not been idle long enough
    let wakes = engine.on_motion(&at(5, 9, 12));
    assert!(wakes.iter().all(|w| w.mac().to_string() != "00:24:1d:d9:fa:09"));

    let status = engine.status();
    assert_eq!(status.rules, 2);
    assert_eq!(status.hosts.len(), 2);
    assert!(status.hosts.iter().all(|h| h.last_wake.is_some()));
}

#[test]
fn test_failed_load_leaves_registry_untouched() {
    let mut registry = RuleRegistry::new();
    load_rules(SAMPLE_RULES, &mut registry).unwrap();

    let broken = format!("{}\nwake 00:00:00:00:00:03:\n    now Mon\n    now Funday\n", SAMPLE_RULES);
    let err = load_rules(&broken, &mut registry).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_hand_built_rule_matches_parsed_rule() {
    let host = Host::new("00:24:1d:d9:fa:09".parse().unwrap());
    let when = When::new(vec![
        Node::leaf(Condition::TimeBetween {
            start: parse_time("08").unwrap(),
            end: parse_time("18").unwrap(),
        }),
        Node::negate(Node::leaf(Condition::DayOfWeek(vec![Weekday::Sun]))),
    ]);
    let built = Rule::from_args(vec![
        RuleArg::HoldOff(60),
        when.into(),
        host.into(),
    ])
    .unwrap();

    let mut registry = RuleRegistry::new();
    load_rules(
        "wake 00:24:1d:d9:fa:09:\n    08 < now < 18\n    hold off 1 min\n    now not Sun\n",
        &mut registry,
    )
    .unwrap();
    let parsed = registry.get(0).unwrap();

    assert_eq!(built.hold_off_secs(), parsed.hold_off_secs());
    assert_eq!(built.when().to_string(), parsed.when().to_string());
}

#[test]
fn test_rule_from_args_validates_pieces() {
    let host = || Host::new("00:00:00:00:00:01".parse().unwrap());
    let when = || When::new(vec![Node::leaf(Condition::InactiveFor(60))]);

    assert_eq!(
        Rule::from_args(vec![RuleArg::from(when())]).unwrap_err(),
        ConfigurationError::MissingHost
    );
    assert_eq!(
        Rule::from_args(vec![host().into()]).unwrap_err(),
        ConfigurationError::MissingWhen
    );
    assert_eq!(
        Rule::from_args(vec![host().into(), host().into(), when().into()]).unwrap_err(),
        ConfigurationError::DuplicateHost(2)
    );

    let rule = Rule::from_args(vec![host().into(), when().into()]).unwrap();
    assert_eq!(rule.hold_off_secs(), 0);
}

#[test]
fn test_dry_run_changes_nothing() {
    let mut registry = RuleRegistry::new();
    load_rules(SAMPLE_RULES, &mut registry).unwrap();
    let engine = Engine::new(registry);

    let now = at(5, 12, 0);
    let previous = (now - Duration::hours(1)).timestamp();
    assert_eq!(engine.dry_run(&now, Some(previous)).len(), 2);
    assert!(engine.motion().last().is_none());
    assert!(engine.status().hosts.iter().all(|h| h.last_wake.is_none()));
}
