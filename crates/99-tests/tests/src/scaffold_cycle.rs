//! Scaffold round trips: a recorded log becomes a test case, the test case
//! drives a session, and the new log scaffolds back into the same case.

use assess::{load, save, FrameTemplate, Scaffold, TestCase};
use pretty_assertions::assert_eq;
use script::Condition;
use session::loopback::loopback;
use session::{run_session, SessionEnd};
use signal::{pref_key, Channel, InputKind, InterpolationKind, Value};
use wire::RequestMatcher;

use crate::{button_script, log_of, preload};

fn button_scaffold() -> Scaffold {
    let start = Condition::when(RequestMatcher::PrintEquals("Start".into()));
    let end = Condition::after_child(5000, &start);
    let mut scaffold = Scaffold::new(vec![FrameTemplate::new(start, Some(end))]);
    scaffold.interpolations.set(
        &pref_key(InputKind::DigitalRead, Some(Channel::Pin(6))),
        InterpolationKind::Start,
    );
    scaffold.default_values.set(
        &pref_key(InputKind::DigitalRead, Some(Channel::Pin(6))),
        Value::Int(1),
    );
    scaffold
}

#[test]
fn generated_case_judges_its_own_recording() {
    let log = log_of(&button_script());
    let case = button_scaffold().build(&log).unwrap();
    let report = case.evaluator.evaluate(&log).unwrap();
    assert!(report.passed(), "{}", assess::description(&report));
}

#[test]
fn scaffold_is_idempotent_across_a_session() {
    let scaffold = button_scaffold();
    let source_log = log_of(&button_script());
    let mut first = scaffold.build(&source_log).unwrap();

    // Drive a live session with the synthesized case; the device replays
    // the same recording over the loopback wire.
    let (mut link, device) = loopback();
    preload(&device, &button_script());
    let outcome = run_session(&mut link, &mut first.handler, None);
    assert!(matches!(outcome.end, SessionEnd::Complete));

    // Scaffolding the new session's log reproduces the same case.
    let second = scaffold.build(&outcome.log).unwrap();
    assert_eq!(second, first);

    // And the new log still passes the original evaluator.
    let report = first.evaluator.evaluate(&outcome.log).unwrap();
    assert!(report.passed(), "{}", assess::description(&report));
}

#[test]
fn persisted_case_round_trips_and_still_works() {
    let dir = std::env::temp_dir().join("firmbench-cycle-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("button.tc");

    let log = log_of(&button_script());
    let case = button_scaffold().build(&log).unwrap();
    save(&case, &path).unwrap();
    let loaded: TestCase = load(&path).unwrap();
    assert_eq!(loaded, case);

    let report = loaded.evaluator.evaluate(&log).unwrap();
    assert!(report.passed());
    std::fs::remove_file(&path).ok();
}
